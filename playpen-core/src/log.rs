//! Append-only store of rendered diagnostic lines.

use tokio::sync::watch;

/// Ordered diagnostic output of a session
///
/// Lines are kept in receipt order and never truncated. Observers obtained
/// from [`LogStore::subscribe`] see the new length after every append.
#[derive(Debug)]
pub struct LogStore {
    lines: Vec<String>,
    changed: watch::Sender<usize>,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            lines: Vec::new(),
            changed,
        }
    }

    /// Append lines in order and notify observers
    pub fn append<I>(&mut self, lines: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let before = self.lines.len();
        self.lines.extend(lines.into_iter().map(Into::into));
        if self.lines.len() > before {
            self.changed.send_replace(self.lines.len());
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The newest line
    pub fn latest(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.changed.send_replace(0);
    }

    /// Observe the line count
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.changed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order() {
        let mut log = LogStore::new();
        log.append(["a", "b"]);
        log.append(vec!["c".to_string()]);

        assert_eq!(log.lines(), ["a", "b", "c"]);
        assert_eq!(log.latest(), Some("c"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_empty_append_does_not_notify() {
        let mut log = LogStore::new();
        let mut observer = log.subscribe();

        log.append(Vec::<String>::new());
        assert!(!observer.has_changed().unwrap());

        log.append(["x"]);
        assert!(observer.has_changed().unwrap());
        assert_eq!(*observer.borrow_and_update(), 1);
    }

    #[test]
    fn test_clear() {
        let mut log = LogStore::new();
        log.append(["x"]);
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.latest(), None);
    }

    #[tokio::test]
    async fn test_observer_wakes_on_append() {
        let mut log = LogStore::new();
        let mut observer = log.subscribe();

        log.append(["one", "two"]);
        observer.changed().await.unwrap();
        assert_eq!(*observer.borrow(), 2);
    }
}
