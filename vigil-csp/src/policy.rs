//! Policies and the append / override merge algorithm.

use crate::directive::{Directive, DirectiveCategory};
use crate::error::{CspError, CspResult};
use crate::hash::HashAlgorithms;
use crate::names::DirectiveName;
use indexmap::IndexMap;
use tracing::trace;

/// How a source policy is folded into a target policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeMode {
    /// Extend directives; fetch directives already declared also inherit `default-src`
    Append,
    /// Replace directives wholesale
    Override,
}

/// An ordered set of directives plus report-only and hashing settings.
///
/// Directive order is insertion order and is the order used when rendering.
/// Cloning deep-copies every directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    directives: IndexMap<String, Directive>,
    report_only: Option<bool>,
    default_hash_algorithms: Option<HashAlgorithms>,
}

impl Policy {
    /// Create a new empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether violations are only reported. Unset reads as `false`.
    pub fn report_only(&self) -> bool {
        self.report_only.unwrap_or(false)
    }

    /// The explicit report-only setting, if any.
    pub fn report_only_setting(&self) -> Option<bool> {
        self.report_only
    }

    pub fn set_report_only(&mut self, report_only: bool) {
        self.report_only = Some(report_only);
    }

    /// Hash algorithms used when none are requested. Unset reads as SHA-384.
    pub fn default_hash_algorithms(&self) -> HashAlgorithms {
        self.default_hash_algorithms.unwrap_or_default()
    }

    /// The explicit hash algorithm setting, if any.
    pub fn default_hash_algorithms_setting(&self) -> Option<HashAlgorithms> {
        self.default_hash_algorithms
    }

    pub fn set_default_hash_algorithms(&mut self, algorithms: HashAlgorithms) {
        self.default_hash_algorithms = Some(algorithms);
    }

    /// Insert a directive. An existing directive of that name is replaced in place.
    pub fn add_directive(&mut self, name: &str, directive: Directive) -> CspResult<()> {
        let name = normalize_name(name)?;
        self.directives.insert(name, directive);
        Ok(())
    }

    /// Look up a directive by name.
    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.get(name)
    }

    pub fn directive_mut(&mut self, name: &str) -> Option<&mut Directive> {
        self.directives.get_mut(name)
    }

    /// Remove a directive, keeping the relative order of the rest.
    pub fn remove_directive(&mut self, name: &str) -> Option<Directive> {
        self.directives.shift_remove(name)
    }

    /// Return the named directive, inserting an empty one if missing.
    ///
    /// New directives take their metadata from the well-known directive table.
    pub fn get_or_add_directive(&mut self, name: &str) -> CspResult<&mut Directive> {
        let name = normalize_name(name)?;
        let directive = self
            .directives
            .entry(name)
            .or_insert_with_key(|name| Directive::for_raw_name(name));
        Ok(directive)
    }

    /// Iterate directives in rendering order.
    pub fn directives(&self) -> impl Iterator<Item = (&str, &Directive)> {
        self.directives.iter().map(|(name, d)| (name.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Fold `source` into this policy.
    pub fn merge(&mut self, source: &Policy, mode: MergeMode) {
        if let Some(report_only) = source.report_only {
            self.report_only = Some(report_only);
        }
        if let Some(algorithms) = source.default_hash_algorithms {
            self.default_hash_algorithms = Some(algorithms);
        }

        let default_src_name = DirectiveName::DefaultSrc.as_str();

        for (name, src) in &source.directives {
            match mode {
                MergeMode::Override => {
                    self.directives.insert(name.clone(), src.clone());
                }
                MergeMode::Append => {
                    // Only a fetch directive the target already declares picks up default-src.
                    let inherited = if name != default_src_name
                        && src.category() == DirectiveCategory::Fetch
                        && self.directives.contains_key(name)
                    {
                        self.directives
                            .get(default_src_name)
                            .map(|default_src| default_src.value().to_string())
                    } else {
                        None
                    };

                    let target = self
                        .directives
                        .entry(name.clone())
                        .or_insert_with(|| src.empty_like());

                    if let Some(inherited) = inherited {
                        target.push_token(&inherited);
                    }
                    target.append_from(src);
                }
            }

            trace!(directive = %name, mode = ?mode, "Merged directive");
        }
    }

    /// Append `source` into this policy.
    pub fn append(&mut self, source: &Policy) {
        self.merge(source, MergeMode::Append);
    }

    /// Override this policy's directives with those of `source`.
    pub fn override_with(&mut self, source: &Policy) {
        self.merge(source, MergeMode::Override);
    }
}

fn normalize_name(name: &str) -> CspResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CspError::invalid_argument(
            "name",
            "directive name cannot be empty",
        ));
    }
    if trimmed.contains([';', ',', ' ']) {
        return Err(CspError::invalid_argument(
            "name",
            format!("`{}` is not a valid directive name", trimmed),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(name: DirectiveName, value: &str) -> Directive {
        let mut directive = Directive::for_name(name);
        if !value.is_empty() {
            directive.append(value).unwrap();
        }
        directive
    }

    #[test]
    fn test_defaults() {
        let policy = Policy::new();
        assert!(!policy.report_only());
        assert_eq!(policy.report_only_setting(), None);
        assert_eq!(policy.default_hash_algorithms(), HashAlgorithms::SHA384);
        assert!(policy.is_empty());
    }

    #[test]
    fn test_add_directive_keeps_position() {
        let mut policy = Policy::new();
        policy
            .add_directive("default-src", directive(DirectiveName::DefaultSrc, "'self'"))
            .unwrap();
        policy
            .add_directive("script-src", directive(DirectiveName::ScriptSrc, "a.org"))
            .unwrap();
        policy
            .add_directive("default-src", directive(DirectiveName::DefaultSrc, "https:"))
            .unwrap();

        let names: Vec<_> = policy.directives().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["default-src", "script-src"]);
        assert_eq!(policy.directive("default-src").unwrap().value(), "https:");
    }

    #[test]
    fn test_add_directive_rejects_bad_names() {
        let mut policy = Policy::new();
        assert!(policy.add_directive("", Directive::default()).is_err());
        assert!(policy.add_directive("a;b", Directive::default()).is_err());
    }

    #[test]
    fn test_get_or_add_uses_table_metadata() {
        let mut policy = Policy::new();
        let frame_ancestors = policy.get_or_add_directive("frame-ancestors").unwrap();
        assert_eq!(frame_ancestors.category(), DirectiveCategory::Navigation);
        assert!(!frame_ancestors.supports_meta_tag());

        let custom = policy.get_or_add_directive("navigate-to").unwrap();
        assert_eq!(custom.category(), DirectiveCategory::Other);
        assert!(custom.supports_report_header());
        assert_eq!(policy.len(), 2);
    }

    #[test]
    fn test_append_inherits_default_src_for_fetch() {
        let mut target = Policy::new();
        target
            .add_directive("default-src", directive(DirectiveName::DefaultSrc, "'self'"))
            .unwrap();
        target
            .add_directive("script-src", directive(DirectiveName::ScriptSrc, ""))
            .unwrap();

        let mut source = Policy::new();
        source
            .add_directive("script-src", directive(DirectiveName::ScriptSrc, "example.org"))
            .unwrap();

        target.append(&source);
        assert_eq!(
            target.directive("script-src").unwrap().value(),
            "'self' example.org"
        );
    }

    #[test]
    fn test_append_new_fetch_directive_takes_source_value() {
        let mut target = Policy::new();
        target
            .add_directive("default-src", directive(DirectiveName::DefaultSrc, "'self'"))
            .unwrap();

        let mut source = Policy::new();
        source
            .add_directive("object-src", directive(DirectiveName::ObjectSrc, "dot.net"))
            .unwrap();

        target.append(&source);
        let object_src = target.directive("object-src").unwrap();
        assert_eq!(object_src.value(), "dot.net");
        assert_eq!(object_src.category(), DirectiveCategory::Fetch);
    }

    #[test]
    fn test_append_does_not_inherit_for_non_fetch() {
        let mut target = Policy::new();
        target
            .add_directive("default-src", directive(DirectiveName::DefaultSrc, "'self'"))
            .unwrap();

        target
            .add_directive("report-uri", directive(DirectiveName::ReportUri, ""))
            .unwrap();
        target
            .add_directive("base-uri", directive(DirectiveName::BaseUri, ""))
            .unwrap();

        let mut source = Policy::new();
        source
            .add_directive("report-uri", directive(DirectiveName::ReportUri, "/report"))
            .unwrap();
        source
            .add_directive("base-uri", directive(DirectiveName::BaseUri, "a.org"))
            .unwrap();

        target.append(&source);
        assert_eq!(target.directive("report-uri").unwrap().value(), "/report");
        assert_eq!(target.directive("base-uri").unwrap().value(), "a.org");
    }

    #[test]
    fn test_append_default_src_does_not_inherit_itself() {
        let mut target = Policy::new();
        target
            .add_directive("default-src", directive(DirectiveName::DefaultSrc, "'self'"))
            .unwrap();

        let mut source = Policy::new();
        source
            .add_directive("default-src", directive(DirectiveName::DefaultSrc, "https:"))
            .unwrap();

        target.append(&source);
        assert_eq!(target.directive("default-src").unwrap().value(), "'self' https:");
    }

    #[test]
    fn test_append_none_cancellation() {
        let mut target = Policy::new();
        target
            .add_directive("object-src", directive(DirectiveName::ObjectSrc, "'none'"))
            .unwrap();

        let mut source = Policy::new();
        source
            .add_directive("object-src", directive(DirectiveName::ObjectSrc, "dot.net"))
            .unwrap();

        target.append(&source);
        assert_eq!(target.directive("object-src").unwrap().value(), "dot.net");
    }

    #[test]
    fn test_override_replaces_wholesale() {
        let mut target = Policy::new();
        let mut script = directive(DirectiveName::ScriptSrc, "'self'");
        script.set_add_nonce(true);
        target.add_directive("script-src", script).unwrap();

        let mut replacement = Directive::new(DirectiveCategory::Other);
        replacement.append("example.org").unwrap();
        replacement.set_supports_meta_tag(false);

        let mut source = Policy::new();
        source.add_directive("script-src", replacement.clone()).unwrap();

        target.override_with(&source);
        assert_eq!(target.directive("script-src"), Some(&replacement));
    }

    #[test]
    fn test_unset_flags_do_not_clobber() {
        let mut target = Policy::new();
        target.set_report_only(true);
        target.set_default_hash_algorithms(HashAlgorithms::SHA512);

        let source = Policy::new();
        target.merge(&source, MergeMode::Append);
        target.merge(&source, MergeMode::Override);

        assert!(target.report_only());
        assert_eq!(target.default_hash_algorithms(), HashAlgorithms::SHA512);

        let mut disabling = Policy::new();
        disabling.set_report_only(false);
        target.append(&disabling);
        assert!(!target.report_only());
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = Policy::new();
        original
            .add_directive("img-src", directive(DirectiveName::ImgSrc, "'self'"))
            .unwrap();

        let mut copy = original.clone();
        copy.get_or_add_directive("img-src")
            .unwrap()
            .append("data:")
            .unwrap();

        assert_eq!(original.directive("img-src").unwrap().value(), "'self'");
        assert_eq!(copy.directive("img-src").unwrap().value(), "'self' data:");
    }

    #[test]
    fn test_remove_directive() {
        let mut policy = Policy::new();
        policy.get_or_add_directive("a-src").unwrap();
        policy.get_or_add_directive("b-src").unwrap();
        policy.get_or_add_directive("c-src").unwrap();

        assert!(policy.remove_directive("b-src").is_some());
        assert!(policy.remove_directive("b-src").is_none());
        let names: Vec<_> = policy.directives().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a-src", "c-src"]);
    }
}
