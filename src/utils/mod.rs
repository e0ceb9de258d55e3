pub mod clock;
pub mod time;

/// Best-effort display label for a package identifier.
///
/// Label lookup against the platform's package manager belongs to the UI
/// layer; the core falls back to the last dot-segment with an uppercased
/// first letter ("com.example.photoshare" -> "Photoshare").
pub fn app_label(package_name: &str) -> String {
    let mut segments = package_name.rsplit('.').filter(|s| !s.is_empty());
    let last = segments.next();
    // Many packages end in a platform suffix ("com.instagram.android");
    // the segment before it reads better as a label.
    let segment = match last {
        Some("android" | "app" | "mobile") => segments.next().or(last),
        other => other,
    }
    .unwrap_or(package_name);
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => package_name.to_string(),
    }
}
