use thiserror::Error;

/// Fatal schema-resolution failure. Aborts the entire run before any
/// scanning or auditing happens; there is no partial/best-effort schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("type `{child}` extends unknown parent `{parent}`")]
    UnknownParent { child: String, parent: String },

    #[error("inheritance cycle: {}", cycle.join(" -> "))]
    InheritanceCycle { cycle: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_lists_path() {
        let err = SchemaError::InheritanceCycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "inheritance cycle: a -> b -> a");
    }
}
