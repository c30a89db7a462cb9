//! Validation utilities for the product catalog

use rust_decimal::Decimal;

// ============================================================================
// References
// ============================================================================

fn fold_accent(c: char) -> &'static str {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => "a",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'î' | 'ï' | 'í' | 'ì' => "i",
        'ô' | 'ö' | 'ó' | 'ò' | 'õ' => "o",
        'ù' | 'û' | 'ü' | 'ú' => "u",
        'ç' => "c",
        'ñ' => "n",
        'ÿ' => "y",
        'œ' => "oe",
        'æ' => "ae",
        _ => "",
    }
}

/// Lowercase ASCII slug: accents folded, every other run of non-alphanumeric
/// characters collapsed into one `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let folded = if c.is_ascii_alphanumeric() {
            Some(c.to_string())
        } else {
            Some(fold_accent(c)).filter(|s| !s.is_empty()).map(str::to_string)
        };

        match folded {
            Some(part) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push_str(&part);
            }
            None => pending_dash = true,
        }
    }

    slug
}

/// Reference generated for a product created without a code
pub fn generate_reference(store_code: &str, name: &str) -> String {
    format!(
        "{}-{}",
        store_code.trim().to_ascii_uppercase(),
        slugify(name).to_ascii_uppercase()
    )
}

/// Validate a user-supplied reference (1-64 chars, alphanumeric, `-` or `_`)
pub fn validate_reference(reference: &str) -> Result<(), &'static str> {
    if reference.is_empty() {
        return Err("Reference cannot be empty");
    }
    if reference.len() > 64 {
        return Err("Reference must be at most 64 characters");
    }
    if !reference
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Reference may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

// ============================================================================
// Barcodes
// ============================================================================

/// Validate an EAN-13 barcode including its check digit
pub fn validate_ean13(code: &str) -> Result<(), &'static str> {
    if code.len() != 13 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("EAN-13 must be exactly 13 digits");
    }

    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;

    if digits[12] != check {
        return Err("Invalid EAN-13 check digit");
    }
    Ok(())
}

/// Validate an internal product code (exactly 6 digits)
pub fn validate_internal_code(code: &str) -> Result<(), &'static str> {
    if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("Internal code must be exactly 6 digits")
    }
}

// ============================================================================
// Quantities and prices
// ============================================================================

pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Validate packaging (units per carton must be positive when set)
pub fn validate_units_per_carton(units: Option<i32>) -> Result<(), &'static str> {
    match units {
        Some(u) if u <= 0 => Err("Units per carton must be positive"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Pain au chocolat"), "pain-au-chocolat");
        assert_eq!(slugify("Éclair café  (x2)"), "eclair-cafe-x2");
        assert_eq!(slugify("  Bœuf & crème brûlée "), "boeuf-creme-brulee");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_generate_reference() {
        assert_eq!(generate_reference("par01", "Pain de mie"), "PAR01-PAIN-DE-MIE");
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("PAR01-PAIN_2").is_ok());
        assert!(validate_reference("").is_err());
        assert!(validate_reference("pain mie").is_err());
    }

    #[test]
    fn test_validate_ean13() {
        assert!(validate_ean13("4006381333931").is_ok());
        assert!(validate_ean13("3017620422003").is_ok());
        assert!(validate_ean13("4006381333932").is_err());
        assert!(validate_ean13("400638133393").is_err());
        assert!(validate_ean13("40063813339a1").is_err());
    }

    #[test]
    fn test_validate_internal_code() {
        assert!(validate_internal_code("012345").is_ok());
        assert!(validate_internal_code("12345").is_err());
        assert!(validate_internal_code("12345a").is_err());
    }

    #[test]
    fn test_validate_price_and_packaging() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::new(-1, 2)).is_err());
        assert!(validate_units_per_carton(None).is_ok());
        assert!(validate_units_per_carton(Some(0)).is_err());
        assert!(validate_units_per_carton(Some(12)).is_ok());
    }
}
