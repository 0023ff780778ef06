//! Validated text fields
//!
//! Lengths are counted in characters, after trimming surrounding whitespace.

use super::ValidationError;

fn check_text(
    field: &'static str,
    raw: &str,
    required: bool,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if required && trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

macro_rules! text_field {
    ($(#[$meta:meta])* $name:ident, $field:literal, required = $required:expr, max = $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub const MAX_LEN: usize = $max;

            pub fn new(s: &str) -> Result<Self, ValidationError> {
                check_text($field, s, $required, $max).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

text_field!(
    /// Category name, 1 to 20 characters
    CategoryName, "category name", required = true, max = 20
);
text_field!(
    /// Vendor of an expense or template, 1 to 40 characters
    Vendor, "vendor", required = true, max = 40
);
text_field!(
    /// Expense description, up to 80 characters
    Description, "description", required = false, max = 80
);
text_field!(
    /// Bill item product, 1 to 40 characters
    Product, "product", required = true, max = 40
);
text_field!(
    /// API key label, 1 to 40 characters
    ApiKeyName, "API key name", required = true, max = 40
);
text_field!(
    /// Template name, 1 to 80 characters
    TemplateName, "template name", required = true, max = 80
);
text_field!(
    /// Template description; multi-line for list-based templates
    TemplateDescription, "template description", required = true, max = 2000
);
text_field!(Comment, "comment", required = false, max = 2000);

impl Description {
    /// Require a non-empty description (simple expenses).
    pub fn required(s: &str) -> Result<Self, ValidationError> {
        let description = Self::new(s)?;
        if description.0.is_empty() {
            return Err(ValidationError::Empty {
                field: "description",
            });
        }
        Ok(description)
    }
}

impl Product {
    /// Build a product name from longer text, cutting it to fit.
    pub fn truncated(s: &str) -> Result<Self, ValidationError> {
        let cut: String = s.trim().chars().take(Self::MAX_LEN).collect();
        Self::new(&cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_input() {
        assert_eq!(Vendor::new("  Aldi ").unwrap().as_str(), "Aldi");
    }

    #[test]
    fn rejects_empty_required() {
        let err = CategoryName::new("   ").unwrap_err();
        assert!(matches!(err, ValidationError::Empty { field: "category name" }));
    }

    #[test]
    fn optional_may_be_empty() {
        assert_eq!(Description::new("").unwrap().as_str(), "");
        assert!(Description::required("").is_err());
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 20 two-byte characters fit
        assert!(CategoryName::new(&"ż".repeat(20)).is_ok());
        let err = CategoryName::new(&"ż".repeat(21)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 20, .. }));
    }

    #[test]
    fn product_truncation() {
        let long = "x".repeat(60);
        assert_eq!(Product::truncated(&long).unwrap().as_str().len(), 40);
        assert!(Product::truncated("").is_err());
    }
}
