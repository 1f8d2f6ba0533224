use crate::api::error::AppError;
use crate::models::StagedFile;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;

/// Maps the client's order list onto staged files.
///
/// Names are matched against the logical name without its extension. Every
/// unmatched name is reported, not just the first. Duplicates in `order` are
/// kept, so the same file is merged twice. When two uploads share a logical
/// name the first one uploaded wins.
pub fn resolve_order(order: &[String], staged: &[StagedFile]) -> Result<Vec<PathBuf>, AppError> {
    let mut by_name: HashMap<&str, &StagedFile> = HashMap::with_capacity(staged.len());
    for file in staged {
        match by_name.entry(file.stem()) {
            Entry::Vacant(slot) => {
                slot.insert(file);
            }
            Entry::Occupied(_) => tracing::warn!(
                "Duplicate logical name '{}', keeping the first upload",
                file.stem()
            ),
        }
    }

    let mut ordered = Vec::with_capacity(order.len());
    let mut unmatched = Vec::new();

    for name in order {
        match by_name.get(name.as_str()) {
            Some(file) => ordered.push(file.path.clone()),
            None => unmatched.push(name.clone()),
        }
    }

    if !unmatched.is_empty() {
        return Err(AppError::UnmatchedOrder(unmatched));
    }

    if ordered.is_empty() {
        return Err(AppError::NoValidFiles);
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(logical: &str, file_name: &str) -> StagedFile {
        StagedFile {
            logical_name: logical.to_string(),
            file_name: file_name.to_string(),
            path: PathBuf::from("/ws/uploads").join(file_name),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_preserves_order() {
        let files = vec![staged("a.pdf", "a.pdf"), staged("b.pdf", "b.pdf"), staged("c.pdf", "c.pdf")];
        let paths = resolve_order(&names(&["c", "a", "b"]), &files).unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/ws/uploads/c.pdf"),
                PathBuf::from("/ws/uploads/a.pdf"),
                PathBuf::from("/ws/uploads/b.pdf"),
            ]
        );
    }

    #[test]
    fn test_reports_every_unmatched_name() {
        let files = vec![staged("a.pdf", "a.pdf"), staged("b.pdf", "b.pdf")];
        let err = resolve_order(&names(&["a", "b", "missing1", "missing2"]), &files).unwrap_err();
        match err {
            AppError::UnmatchedOrder(missing) => {
                assert_eq!(missing, names(&["missing1", "missing2"]))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_order_has_no_valid_files() {
        let files = vec![staged("a.pdf", "a.pdf")];
        assert!(matches!(
            resolve_order(&[], &files),
            Err(AppError::NoValidFiles)
        ));
    }

    #[test]
    fn test_duplicates_pass_through() {
        let files = vec![staged("a.pdf", "a.pdf")];
        let paths = resolve_order(&names(&["a", "a"]), &files).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], paths[1]);
    }

    #[test]
    fn test_shared_logical_name_resolves_to_first_upload() {
        let files = vec![
            staged("report.pdf", "report.pdf"),
            staged("report.pdf", "report_conflict_1.pdf"),
        ];
        let paths = resolve_order(&names(&["report"]), &files).unwrap();
        assert_eq!(paths, vec![PathBuf::from("/ws/uploads/report.pdf")]);
    }

    #[test]
    fn test_full_name_with_extension_does_not_match() {
        let files = vec![staged("a.pdf", "a.pdf")];
        assert!(matches!(
            resolve_order(&names(&["a.pdf"]), &files),
            Err(AppError::UnmatchedOrder(_))
        ));
    }
}
