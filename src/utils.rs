//! Shared utility functions

/// Map a signed bearing in degrees onto an index into a scan of `len`
/// readings, where index 0 is the forward bearing and indices increase
/// counter-clockwise. Negative bearings wrap to the end of the scan.
#[inline]
pub fn scan_index(bearing_deg: i32, len: usize) -> usize {
    let n = len as i32;
    (((bearing_deg % n) + n) % n) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_index_wrapping() {
        assert_eq!(scan_index(0, 360), 0);
        assert_eq!(scan_index(5, 360), 5);
        assert_eq!(scan_index(-1, 360), 359);
        assert_eq!(scan_index(-3, 360), 357);
        assert_eq!(scan_index(365, 360), 5);
    }
}
