//! human readable byte counts on the binary (1024-based) ladder

const LADDER: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count as `B`, `KB`, `MB`, `GB` or `TB`, dividing by 1024
/// per step.
/// # Example
/// ```
/// use vdisk::utils::size_display::display_size;
/// assert_eq!(display_size(512), "512 B");
/// assert_eq!(display_size(10_000), "9.77 KB");
/// assert_eq!(display_size(2_000_000_000), "1.86 GB");
/// ```
pub fn display_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < LADDER.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, LADDER[0])
    } else {
        format!("{:.2} {}", value, LADDER[unit])
    }
}
