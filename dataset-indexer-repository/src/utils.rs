//! Utility functions for the dataset indexer repository.

/// Convert a dataset display name into a valid search index name.
///
/// Replaces the characters the engine prohibits in index names with
/// underscores, lowercases, and strips leading underscores.
///
/// # Example
///
/// ```
/// use dataset_indexer_repository::convert_to_index_name;
///
/// assert_eq!(convert_to_index_name("1000 Genomes"), "1000_genomes");
/// ```
pub fn convert_to_index_name(dataset_name: &str) -> String {
    const PROHIBITED: [char; 10] = [' ', '"', '*', '\\', '<', '|', ',', '>', '/', '?'];

    let mut name: String = dataset_name
        .chars()
        .map(|c| if PROHIBITED.contains(&c) { '_' } else { c })
        .collect();
    name = name.to_lowercase();
    name.trim_start_matches('_').to_string()
}

/// Validate that an identifier is safe to embed in a server-side script.
///
/// Script identifiers (array field names, merge key columns) come from
/// configuration, so they are restricted to alphanumerics and underscores
/// before any script is generated.
pub fn validate_script_identifier(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_to_index_name_replaces_prohibited_chars() {
        assert_eq!(convert_to_index_name("1000 Genomes"), "1000_genomes");
        assert_eq!(convert_to_index_name("a/b?c*d"), "a_b_c_d");
        assert_eq!(convert_to_index_name("A,B<C>D"), "a_b_c_d");
    }

    #[test]
    fn test_convert_to_index_name_strips_leading_underscore() {
        assert_eq!(convert_to_index_name("_private"), "private");
        assert_eq!(convert_to_index_name(" padded"), "padded");
    }

    #[test]
    fn test_convert_to_index_name_lowercases() {
        assert_eq!(convert_to_index_name("Framingham"), "framingham");
    }

    #[test]
    fn test_validate_script_identifier() {
        assert!(validate_script_identifier("sample_id"));
        assert!(validate_script_identifier("files"));
        assert!(!validate_script_identifier(""));
        assert!(!validate_script_identifier("a-b"));
        assert!(!validate_script_identifier("a.b"));
        assert!(!validate_script_identifier("a'b"));
    }
}
