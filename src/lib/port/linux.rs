use glob::glob;
use std::fs;
use std::path::PathBuf;

/// Whether any process (this one included) holds `port_name` open.
pub fn is_port_open(port_name: &str) -> bool {
    let target = fs::canonicalize(port_name).unwrap_or_else(|_| PathBuf::from(port_name));

    glob("/proc/[0-9]*/fd/*")
        .map(|paths| {
            paths
                .filter_map(|p| p.ok())
                .filter_map(|path| fs::read_link(path).ok())
                .any(|link| link == target)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_is_not_open() {
        assert!(!is_port_open("/dev/lx200-does-not-exist"));
    }
}
