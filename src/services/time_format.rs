/// Turn a loosely written time ("615", "6.15pm", " 06:15 ") into `HH:MM`.
///
/// The am/pm marker is stripped, not applied, so "6.15pm" becomes "06:15".
/// Hours and minutes are not range-checked here.
pub fn normalize(raw: &str) -> Option<String> {
    let mut s = raw.trim().to_lowercase().replace('.', ":");
    s = s.replace("am", "").replace("pm", "");
    let s = s.trim();

    let joined;
    let s = if !s.contains(':') && (3..=4).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) {
        let (h, m) = s.split_at(s.len() - 2);
        joined = format!("{h}:{m}");
        joined.as_str()
    } else {
        s
    };

    let mut parts = s.split(':');
    let hour: u32 = parts.next()?.trim().parse().ok()?;
    let minute_token = parts.next()?.trim();
    let minute: u32 = minute_token
        .get(..minute_token.len().min(2))?
        .parse()
        .ok()?;

    Some(format!("{hour:02}:{minute:02}"))
}
