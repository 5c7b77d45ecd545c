//! Cascading multi-level category filter.
//!
//! Products carry a category path, root first (`["Tools", "OBD", "Bluetooth"]`).
//! [`CategoryTree`] collects every path into a root set and a parent → children
//! map; [`CascadingFilter`] holds the shopper's current selection and derives
//! the dropdown levels shown above the product grid.

use std::collections::{BTreeMap, BTreeSet};

/// Maximum number of dropdown levels rendered.
pub const MAX_LEVELS: usize = 4;

/// Labels for each dropdown level.
pub const LEVEL_LABELS: [&str; MAX_LEVELS] =
    ["Main Category", "Sub-Category", "Brand/Type", "Model/Variant"];

/// Resolve a product's category path.
///
/// `categories` wins when it has entries; otherwise the single legacy
/// `category` is used. Blank entries end the path.
#[must_use]
pub fn category_path<'a>(categories: &'a [String], category: Option<&'a str>) -> Vec<&'a str> {
    let raw: Vec<&str> = if categories.is_empty() {
        category.into_iter().collect()
    } else {
        categories.iter().map(String::as_str).collect()
    };

    raw.into_iter()
        .map(str::trim)
        .take_while(|s| !s.is_empty())
        .collect()
}

/// Parent → children index over all known category paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    roots: BTreeSet<String>,
    children: BTreeMap<String, BTreeSet<String>>,
}

impl CategoryTree {
    /// Build the tree from category paths.
    pub fn build<P, S>(paths: impl IntoIterator<Item = P>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::default();
        for path in paths {
            let mut parent: Option<String> = None;
            for segment in path {
                let segment = segment.as_ref();
                match parent {
                    None => {
                        tree.roots.insert(segment.to_owned());
                    }
                    Some(ref p) => {
                        tree.children
                            .entry(p.clone())
                            .or_default()
                            .insert(segment.to_owned());
                    }
                }
                parent = Some(segment.to_owned());
            }
        }
        tree
    }

    /// Whether no product had a category.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Sorted root categories.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(String::as_str)
    }

    /// Sorted children of `parent` (empty when unknown).
    pub fn children(&self, parent: &str) -> impl Iterator<Item = &str> {
        self.children
            .get(parent)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Dropdown options for `level` given the current selection.
    ///
    /// Level 0 lists the roots. Deeper levels list the children of the
    /// selection one level up, or nothing when that level is unselected.
    #[must_use]
    pub fn options(&self, level: usize, selected: &[String]) -> Vec<String> {
        if level == 0 {
            return self.roots().map(str::to_owned).collect();
        }
        selected
            .get(level - 1)
            .map(|parent| self.children(parent).map(str::to_owned).collect())
            .unwrap_or_default()
    }
}

/// One rendered dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLevel {
    pub index: usize,
    pub label: &'static str,
    pub options: Vec<String>,
    pub selected: Option<String>,
    /// Set while the level above has no selection.
    pub disabled: bool,
}

/// The shopper's selected category path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadingFilter {
    selected: Vec<String>,
}

impl CascadingFilter {
    /// Empty selection (matches every product).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            selected: Vec::new(),
        }
    }

    /// Restore a selection, e.g. from query parameters. Blank entries end
    /// the path and anything past [`MAX_LEVELS`] is dropped.
    #[must_use]
    pub fn from_path<S: AsRef<str>>(path: impl IntoIterator<Item = S>) -> Self {
        let selected = path
            .into_iter()
            .map(|s| s.as_ref().trim().to_owned())
            .take_while(|s| !s.is_empty())
            .take(MAX_LEVELS)
            .collect();
        Self { selected }
    }

    /// Current selection, root first.
    #[must_use]
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Whether anything is selected.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Choose `value` at `level`, discarding any deeper selection.
    ///
    /// Returns `false` (and changes nothing) when `level` skips past the
    /// current depth or exceeds [`MAX_LEVELS`].
    pub fn select(&mut self, level: usize, value: impl Into<String>) -> bool {
        if level > self.selected.len() || level >= MAX_LEVELS {
            return false;
        }
        self.selected.truncate(level);
        self.selected.push(value.into());
        true
    }

    /// Clear the selection at `level` and everything below it.
    pub fn remove_level(&mut self, level: usize) {
        self.selected.truncate(level);
    }

    /// Clear the whole selection.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Dropdowns to render for the current selection.
    ///
    /// Shows one level past the deepest selection, capped at
    /// [`MAX_LEVELS`]. Non-root levels without options are omitted.
    #[must_use]
    pub fn levels(&self, tree: &CategoryTree) -> Vec<FilterLevel> {
        let shown = (self.selected.len() + 1).min(MAX_LEVELS);

        LEVEL_LABELS
            .iter()
            .enumerate()
            .take(shown)
            .filter_map(|(index, &label)| {
                let options = tree.options(index, &self.selected);
                if index > 0 && options.is_empty() {
                    return None;
                }
                Some(FilterLevel {
                    index,
                    label,
                    options,
                    selected: self.selected.get(index).cloned(),
                    disabled: index > 0 && self.selected.get(index - 1).is_none(),
                })
            })
            .collect()
    }

    /// Whether a product path starts with the selected path.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.selected.len() <= path.len()
            && self
                .selected
                .iter()
                .zip(path)
                .all(|(want, have)| want == have.as_ref())
    }
}

/// Case-insensitive search over a product name and its category path.
///
/// A blank query matches everything.
#[must_use]
pub fn matches_search<S: AsRef<str>>(query: &str, name: &str, path: &[S]) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    name.to_lowercase().contains(&query)
        || path
            .iter()
            .any(|segment| segment.as_ref().to_lowercase().contains(&query))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obd_tree() -> CategoryTree {
        CategoryTree::build([
            vec!["Tools", "OBD", "Bluetooth"],
            vec!["Tools", "OBD", "Wired"],
            vec!["Software", "ECU"],
        ])
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_tree_roots_and_children() {
        let tree = obd_tree();
        assert_eq!(tree.roots().collect::<Vec<_>>(), vec!["Software", "Tools"]);
        assert_eq!(tree.children("Tools").collect::<Vec<_>>(), vec!["OBD"]);
        assert_eq!(
            tree.children("OBD").collect::<Vec<_>>(),
            vec!["Bluetooth", "Wired"]
        );
        assert_eq!(tree.children("Wired").count(), 0);
        assert_eq!(tree.children("Nope").count(), 0);
    }

    #[test]
    fn test_selecting_tools_then_obd() {
        let tree = obd_tree();
        let mut filter = CascadingFilter::new();

        assert!(filter.select(0, "Tools"));
        assert_eq!(tree.options(1, filter.selected()), strings(&["OBD"]));

        assert!(filter.select(1, "OBD"));
        assert_eq!(
            tree.options(2, filter.selected()),
            strings(&["Bluetooth", "Wired"])
        );
    }

    #[test]
    fn test_options_empty_without_parent_selection() {
        let tree = obd_tree();
        assert!(tree.options(1, &[]).is_empty());
        assert!(tree.options(3, &strings(&["Tools"])).is_empty());
    }

    #[test]
    fn test_select_truncates_deeper_levels() {
        let mut filter = CascadingFilter::from_path(["Tools", "OBD", "Wired"]);
        assert!(filter.select(0, "Software"));
        assert_eq!(filter.selected(), strings(&["Software"]).as_slice());
    }

    #[test]
    fn test_select_rejects_skipped_or_excess_levels() {
        let mut filter = CascadingFilter::new();
        assert!(!filter.select(2, "OBD"));
        assert!(!filter.is_active());

        let mut filter = CascadingFilter::from_path(["a", "b", "c", "d"]);
        assert!(!filter.select(4, "e"));
        assert_eq!(filter.selected().len(), 4);
    }

    #[test]
    fn test_remove_level_and_clear() {
        let mut filter = CascadingFilter::from_path(["Tools", "OBD", "Wired"]);
        filter.remove_level(1);
        assert_eq!(filter.selected(), strings(&["Tools"]).as_slice());
        filter.clear();
        assert!(!filter.is_active());
    }

    #[test]
    fn test_from_path_stops_at_blank_and_caps_depth() {
        let filter = CascadingFilter::from_path(["Tools", " ", "Wired"]);
        assert_eq!(filter.selected(), strings(&["Tools"]).as_slice());

        let filter = CascadingFilter::from_path(["a", "b", "c", "d", "e"]);
        assert_eq!(filter.selected().len(), MAX_LEVELS);
    }

    #[test]
    fn test_levels_show_one_past_selection() {
        let tree = obd_tree();

        let levels = CascadingFilter::new().levels(&tree);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].label, "Main Category");
        assert_eq!(levels[0].options, strings(&["Software", "Tools"]));
        assert_eq!(levels[0].selected, None);
        assert!(!levels[0].disabled);

        let levels = CascadingFilter::from_path(["Tools", "OBD"]).levels(&tree);
        let labels: Vec<_> = levels.iter().map(|l| l.label).collect();
        assert_eq!(labels, vec!["Main Category", "Sub-Category", "Brand/Type"]);
        assert_eq!(levels[1].selected.as_deref(), Some("OBD"));
        assert_eq!(levels[2].options, strings(&["Bluetooth", "Wired"]));
    }

    #[test]
    fn test_levels_hide_empty_non_root_levels() {
        let tree = obd_tree();
        let levels = CascadingFilter::from_path(["Tools", "OBD", "Wired"]).levels(&tree);
        assert_eq!(levels.len(), 3);
        assert!(levels.iter().all(|l| !l.disabled));
    }

    #[test]
    fn test_levels_capped_at_four() {
        let tree = CategoryTree::build([vec!["a", "b", "c", "d", "e"]]);
        let levels = CascadingFilter::from_path(["a", "b", "c", "d"]).levels(&tree);
        assert_eq!(levels.len(), MAX_LEVELS);
        assert_eq!(levels[3].label, "Model/Variant");
    }

    #[test]
    fn test_prefix_matching() {
        let path = ["Tools", "OBD", "Wired"];
        assert!(CascadingFilter::new().matches(&path));
        assert!(CascadingFilter::from_path(["Tools"]).matches(&path));
        assert!(CascadingFilter::from_path(["Tools", "OBD", "Wired"]).matches(&path));
        assert!(!CascadingFilter::from_path(["Tools", "OBD", "Bluetooth"]).matches(&path));
        assert!(!CascadingFilter::from_path(["Tools", "OBD", "Wired", "X"]).matches(&path));
        assert!(!CascadingFilter::from_path(["Tools"]).matches::<&str>(&[]));
    }

    #[test]
    fn test_category_path_fallback() {
        let categories = strings(&["Tools", "OBD"]);
        assert_eq!(category_path(&categories, Some("Legacy")), vec!["Tools", "OBD"]);
        assert_eq!(category_path(&[], Some("Legacy")), vec!["Legacy"]);
        assert!(category_path(&[], None).is_empty());
        assert!(category_path(&[], Some("  ")).is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_on_name_and_path() {
        let path = ["Tools", "OBD"];
        assert!(matches_search("", "Scanner", &path));
        assert!(matches_search("scan", "OBD Scanner Pro", &path));
        assert!(matches_search("obd", "Multimeter", &path));
        assert!(!matches_search("ecu", "Multimeter", &path));
    }
}
