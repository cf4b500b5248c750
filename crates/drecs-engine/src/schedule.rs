//! The active system list.

/// Names of active systems, in activation order.
///
/// A name appears at most once. Activating an already active name keeps its
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    active: Vec<String>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` unless already active. Returns whether it was added.
    pub fn activate(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.active.push(name.to_owned());
        true
    }

    /// Remove `name` if active. Returns whether it was removed.
    pub fn deactivate(&mut self, name: &str) -> bool {
        match self.active.iter().position(|s| s == name) {
            Some(pos) => {
                self.active.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.active.iter().any(|s| s == name)
    }

    pub fn names(&self) -> &[String] {
        &self.active
    }

    /// Copy of the list as it stands now. A tick iterates this copy, so
    /// activations made during the tick only take effect on the next one.
    pub fn snapshot(&self) -> Vec<String> {
        self.active.clone()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_is_idempotent_and_keeps_first_position() {
        let mut s = Schedule::new();
        assert!(s.activate("a"));
        assert!(s.activate("b"));
        assert!(!s.activate("a"));
        assert_eq!(s.names(), &["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn deactivate_absent_is_noop() {
        let mut s = Schedule::new();
        s.activate("a");
        assert!(!s.deactivate("zzz"));
        assert!(s.deactivate("a"));
        assert!(s.is_empty());
    }

    #[test]
    fn snapshot_is_detached() {
        let mut s = Schedule::new();
        s.activate("a");
        let snap = s.snapshot();
        s.activate("b");
        assert_eq!(snap, vec!["a".to_owned()]);
    }
}
