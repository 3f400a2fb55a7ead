//! Mangled-name grammar.
//!
//! [`MangledName`] covers the plain (non-nested) form `_Z<len><identifier><rest>`
//! used by the SPIR builtin library. Names are always re-rendered from their
//! parsed structure, so the length field cannot drift from the identifier it
//! describes.
use crate::magic::LIBRARY_PREFIXES;

pub mod demangle;

pub use demangle::{demangle, demangle_or_raw};

/// Itanium mangling marker.
pub const MANGLING_PREFIX: &str = "_Z";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MangledName<'a> {
    /// Source identifier, exactly as many characters as the length field declares.
    pub identifier: &'a str,
    /// Encoded parameter types and anything else following the identifier.
    pub rest: &'a str,
}

impl<'a> MangledName<'a> {
    /// Parse `_Z<len><identifier><rest>`.
    ///
    /// Returns `None` for names without the marker, for nested or special names
    /// (no length field right after the marker), and when the declared length runs
    /// past the end of the string.
    pub fn parse(name: &'a str) -> Option<Self> {
        let encoded = name.strip_prefix(MANGLING_PREFIX)?;
        let digits = encoded
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }

        let len: usize = encoded[..digits].parse().ok()?;
        let body = &encoded[digits..];
        if len == 0 || body.len() < len || !body.is_char_boundary(len) {
            return None;
        }

        let (identifier, rest) = body.split_at(len);
        Some(Self { identifier, rest })
    }

    /// The length field as rendered.
    pub fn declared_len(&self) -> usize {
        self.identifier.len()
    }

    /// Remove `prefix` from the identifier. Only applies when the identifier starts
    /// with the prefix literally and something remains after it.
    pub fn strip_identifier_prefix(&self, prefix: &str) -> Option<MangledName<'a>> {
        let identifier = self.identifier.strip_prefix(prefix)?;
        if identifier.is_empty() {
            return None;
        }
        Some(MangledName {
            identifier,
            rest: self.rest,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "{}{}{}{}",
            MANGLING_PREFIX,
            self.identifier.len(),
            self.identifier,
            self.rest
        )
    }
}

impl std::fmt::Display for MangledName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Strip the first matching library namespace from a mangled builtin name.
///
/// Prefixes are tried most specific first. Returns `None` when the name does not
/// parse or no prefix applies; the caller then keeps the name unchanged.
pub fn strip_library_prefix(name: &str) -> Option<String> {
    let parsed = MangledName::parse(name)?;
    LIBRARY_PREFIXES
        .iter()
        .find_map(|prefix| parsed.strip_identifier_prefix(prefix))
        .map(|stripped| stripped.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_names() {
        let name = MangledName::parse("_Z24__spir_ocl_get_global_idj").unwrap();
        assert_eq!(name.identifier, "__spir_ocl_get_global_id");
        assert_eq!(name.rest, "j");
        assert_eq!(name.declared_len(), 24);
        assert_eq!(name.render(), "_Z24__spir_ocl_get_global_idj");
    }

    #[test]
    fn parse_rejects_unsupported_forms() {
        assert_eq!(MangledName::parse("get_global_id"), None);
        assert_eq!(MangledName::parse("_ZN2cl4sycl3fooEv"), None);
        assert_eq!(MangledName::parse("_Z__spir_ocl_x"), None);
        assert_eq!(MangledName::parse("_Z99__spir_ocl_x"), None);
        assert_eq!(MangledName::parse("_Z0v"), None);
    }

    #[test]
    fn strip_known_prefixes() {
        assert_eq!(
            strip_library_prefix("_Z24__spir_ocl_get_global_idj").as_deref(),
            Some("_Z13get_global_idj")
        );
        assert_eq!(
            strip_library_prefix("_Z16__spirv_ocl_sqrtf").as_deref(),
            Some("_Z4sqrtf")
        );
        assert_eq!(
            strip_library_prefix("_Z17__spirv_ocl_u_absj").as_deref(),
            Some("_Z3absj")
        );
        assert_eq!(
            strip_library_prefix("_Z17__spirv_ocl_s_maxii").as_deref(),
            Some("_Z3maxii")
        );
    }

    #[test]
    fn most_specific_prefix_wins() {
        // `__spirv_ocl_u_` must not be shadowed by `__spirv_ocl_`.
        let stripped = strip_library_prefix("_Z17__spirv_ocl_u_clzj").unwrap();
        assert_eq!(stripped, "_Z3clzj");
    }

    #[test]
    fn non_matching_names_are_left_alone() {
        assert_eq!(strip_library_prefix("_Z13get_global_idj"), None);
        assert_eq!(strip_library_prefix("_Z3fooj"), None);
        assert_eq!(strip_library_prefix("__spir_ocl_get_global_id"), None);
        assert_eq!(strip_library_prefix("_Z11__spir_ocl_"), None);
    }

    #[test]
    fn rendered_length_matches_identifier() {
        for name in [
            "_Z24__spir_ocl_get_global_idj",
            "_Z16__spirv_ocl_sqrtf",
            "_Z17__spirv_ocl_u_clzj",
        ] {
            let stripped = strip_library_prefix(name).unwrap();
            let parsed = MangledName::parse(&stripped).unwrap();
            assert_eq!(parsed.declared_len(), parsed.identifier.len());
            assert!(
                stripped
                    .strip_prefix("_Z")
                    .unwrap()
                    .starts_with(&parsed.identifier.len().to_string())
            );
        }
    }
}
