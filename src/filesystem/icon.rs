/// CSS icon class for a record, e.g. `"fileIconMd fileIcon"` for `readme.md`.
///
/// The extension is taken after the last `.` unless that dot starts the name.
/// It is lowercased, then its first letter is upper-cased and every `-`
/// followed by a letter is replaced by that letter upper-cased. Other dashes
/// stay.
pub fn icon_class(name: &str, is_directory: bool) -> String {
    let class = match name.rfind('.') {
        Some(dot) if dot > 0 => format!("fileIcon{}", camel_case(&name[dot + 1..])),
        _ if is_directory => "fileIconDIR".to_string(),
        _ => "fileIconUnknown".to_string(),
    };
    format!("{} fileIcon", class)
}

fn camel_case(extension: &str) -> String {
    let lower = extension.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut chars = lower.chars().peekable();

    if let Some(&first) = chars.peek() {
        if first.is_ascii_lowercase() {
            out.push(first.to_ascii_uppercase());
            chars.next();
        }
    }

    while let Some(ch) = chars.next() {
        if ch == '-' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_alphabetic() {
                    out.push(next.to_ascii_uppercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}
