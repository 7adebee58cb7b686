/// English-style suffix pluralization used for default storage directories.
///
/// Consonant + `y` becomes `ies`; sibilant endings take `es`; everything
/// else takes `s`. Types can override with an explicit `plural`.
pub fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        let before = stem.chars().next_back();
        let is_vowel = matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u'));
        if before.is_some() && !is_vowel {
            return format!("{stem}ies");
        }
    }

    if name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
    {
        return format!("{name}es");
    }

    format!("{name}s")
}

#[cfg(test)]
mod tests {
    use super::pluralize;

    #[test]
    fn suffix_rules() {
        assert_eq!(pluralize("task"), "tasks");
        assert_eq!(pluralize("entity"), "entities");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("process"), "processes");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("quiz"), "quizes");
        assert_eq!(pluralize("sketch"), "sketches");
        assert_eq!(pluralize("wish"), "wishes");
        assert_eq!(pluralize("y"), "ys");
    }
}
