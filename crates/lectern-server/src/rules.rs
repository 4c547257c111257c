//! Watch rules: which changed paths trigger which task.

use glob::Pattern;
use lectern_static::fsutil::match_options;

use crate::server::ServerError;

/// Glob patterns paired with the task they trigger.
#[derive(Debug, Clone)]
pub struct WatchRule {
    patterns: Vec<Pattern>,

    /// `None` reloads browsers without running anything
    task: Option<String>,
}

impl WatchRule {
    pub fn new<S: AsRef<str>>(patterns: &[S], task: Option<&str>) -> Result<Self, ServerError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| ServerError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            patterns,
            task: task.map(String::from),
        })
    }

    /// Whether a project-relative, `/`-separated path matches.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(path, match_options()))
    }

    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }
}

/// Ordered set of watch rules.
#[derive(Debug, Clone, Default)]
pub struct WatchRules {
    rules: Vec<WatchRule>,
}

impl WatchRules {
    pub fn new(rules: Vec<WatchRule>) -> Self {
        Self { rules }
    }

    /// Distinct tasks triggered by `path`, in rule order.
    ///
    /// `None` when no rule matches; an empty list means reload only.
    pub fn tasks_for(&self, path: &str) -> Option<Vec<&str>> {
        let mut matched = false;
        let mut tasks: Vec<&str> = Vec::new();

        for rule in self.rules.iter().filter(|rule| rule.matches(path)) {
            matched = true;
            if let Some(task) = rule.task() {
                if !tasks.contains(&task) {
                    tasks.push(task);
                }
            }
        }

        matched.then_some(tasks)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> WatchRules {
        WatchRules::new(vec![
            WatchRule::new(&["*.html", "*.md"], None).unwrap(),
            WatchRule::new(&["slides.md"], Some("prebuild")).unwrap(),
            WatchRule::new(&["js/**/*"], Some("js")).unwrap(),
            WatchRule::new(
                &["css/theme/source/*.scss", "css/theme/template/*.scss"],
                Some("css-themes"),
            )
            .unwrap(),
            WatchRule::new(&["css/*.scss"], Some("css-core")).unwrap(),
        ])
    }

    #[test]
    fn document_change_reloads_and_rebuilds() {
        assert_eq!(rules().tasks_for("slides.md"), Some(vec!["prebuild"]));
    }

    #[test]
    fn markup_change_only_reloads() {
        assert_eq!(rules().tasks_for("index.html"), Some(vec![]));
        assert_eq!(rules().tasks_for("README.md"), Some(vec![]));
    }

    #[test]
    fn star_does_not_cross_directories() {
        let rules = rules();

        assert_eq!(rules.tasks_for("css/reveal.scss"), Some(vec!["css-core"]));
        assert_eq!(
            rules.tasks_for("css/theme/source/black.scss"),
            Some(vec!["css-themes"])
        );
        assert_eq!(rules.tasks_for("docs/notes.md"), None);
    }

    #[test]
    fn nested_scripts_match() {
        assert_eq!(rules().tasks_for("js/utils/util.js"), Some(vec!["js"]));
    }

    #[test]
    fn unmatched_paths_do_nothing() {
        assert_eq!(rules().tasks_for("dist/reveal.css"), None);
    }

    #[test]
    fn duplicate_tasks_run_once() {
        let rules = WatchRules::new(vec![
            WatchRule::new(&["css/*.scss"], Some("css")).unwrap(),
            WatchRule::new(&["css/reveal.scss"], Some("css")).unwrap(),
        ]);

        assert_eq!(rules.tasks_for("css/reveal.scss"), Some(vec!["css"]));
    }

    #[test]
    fn rejects_invalid_patterns() {
        let result = WatchRule::new(&["css/[.scss"], Some("css"));

        assert!(matches!(result, Err(ServerError::InvalidPattern { .. })));
    }
}
