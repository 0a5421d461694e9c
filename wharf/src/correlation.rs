use uuid::Uuid;

/// Generates a fresh correlation id.
///
/// Correlation ids are version-4 UUIDs rather than the pointer-based shortcut
/// used by the source this runtime is modeled on (see `DESIGN.md`): this
/// keeps ids globally unique and lets pending-call slots be garbage
/// collected freely once disposed, since nothing aliases their address.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_ne;
    use std::collections::HashSet;

    #[test]
    fn correlation_ids_are_unique() {
        let ids: HashSet<String> = (0..1_000).map(|_| new_correlation_id()).collect();

        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn two_ids_differ() {
        assert_ne!(new_correlation_id(), new_correlation_id());
    }
}
