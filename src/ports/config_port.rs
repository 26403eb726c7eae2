//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Non-negative integer setting; negative values fall back to `default`.
    fn get_usize(&self, section: &str, key: &str, default: usize) -> usize {
        usize::try_from(self.get_int(section, key, default as i64)).unwrap_or(default)
    }

    /// Non-negative integer setting as `u64`; negative values fall back to `default`.
    fn get_u64(&self, section: &str, key: &str, default: u64) -> u64 {
        u64::try_from(self.get_int(section, key, default as i64)).unwrap_or(default)
    }
}
