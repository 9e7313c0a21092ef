//! crates/care_training_core/src/pricing.rs
//!
//! Calendar price composition: database price, per-event custom price and the
//! site-wide discount overlay.

use crate::domain::{CalendarPricing, PriceValue, SiteWideDiscount};

/// Parses a currency-formatted price such as `"£1,250.00"`. Returns `None` for unparsable text.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_price(value: &PriceValue) -> Option<f64> {
    match value {
        PriceValue::Number(n) if n.is_finite() => Some(*n),
        PriceValue::Number(_) => None,
        PriceValue::Text(text) => parse_price_text(text),
    }
}

/// Formats a price the way the calendar shows it: pound sign, whole pounds.
pub fn format_price(value: f64) -> String {
    format!("£{}", value.round() as i64)
}

fn percent_off(original: f64, price: f64) -> u32 {
    if original <= 0.0 {
        return 0;
    }
    (((original - price) / original) * 100.0).round().max(0.0) as u32
}

/// Resolves the price shown for one calendar event.
///
/// A custom price below the original is a discount; a custom price above it is kept as a
/// deliberate event price without a discount flag. The site-wide discount only applies when
/// nothing is discounted yet or when it beats the current price.
pub fn compose_calendar_price(
    original_price: f64,
    scheduled_price: Option<&PriceValue>,
    sitewide: Option<&SiteWideDiscount>,
) -> CalendarPricing {
    let mut final_price = original_price;
    let mut custom_price = None;
    let mut has_discount = false;
    let mut discount_percent = 0;
    let mut literal_display = None;

    if let Some(value) = scheduled_price {
        if let Some(parsed) = parse_price(value) {
            if parsed != original_price {
                custom_price = Some(parsed);
                final_price = parsed;
                if parsed < original_price {
                    has_discount = true;
                    discount_percent = percent_off(original_price, parsed);
                }
            } else if let PriceValue::Text(text) = value {
                literal_display = Some(text.clone());
            }
        }
    }

    let effective = sitewide.filter(|d| d.is_effective()).cloned();
    let mut site_wide_applied = false;
    if let Some(discount) = effective.as_ref() {
        if original_price > 0.0 {
            let sitewide_price = original_price * (1.0 - discount.percentage / 100.0);
            if !has_discount || sitewide_price < final_price {
                final_price = sitewide_price;
                has_discount = true;
                discount_percent = discount.percentage.round() as u32;
                site_wide_applied = true;
                literal_display = None;
            }
        }
    }

    let display_price = literal_display.unwrap_or_else(|| format_price(final_price));

    CalendarPricing {
        original_price,
        custom_price,
        final_price,
        display_price,
        has_discount,
        discount_percent,
        site_wide_discount: effective,
        site_wide_applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sitewide(percentage: f64) -> SiteWideDiscount {
        SiteWideDiscount {
            active: true,
            percentage,
            label: "Spring Sale".into(),
        }
    }

    #[test]
    fn parses_currency_strings() {
        assert_eq!(parse_price_text("£1,250.50"), Some(1250.5));
        assert_eq!(parse_price_text(" 85 "), Some(85.0));
        assert_eq!(parse_price_text("POA"), None);
        assert_eq!(parse_price_text(""), None);
    }

    #[test]
    fn sitewide_discount_alone() {
        let pricing = compose_calendar_price(100.0, None, Some(&sitewide(20.0)));
        assert_eq!(pricing.display_price, "£80");
        assert!(pricing.has_discount);
        assert_eq!(pricing.discount_percent, 20);
        assert!(pricing.site_wide_applied);
    }

    #[test]
    fn lower_event_price_is_a_discount() {
        let pricing = compose_calendar_price(100.0, Some(&PriceValue::Number(70.0)), None);
        assert_eq!(pricing.display_price, "£70");
        assert_eq!(pricing.custom_price, Some(70.0));
        assert!(pricing.has_discount);
        assert_eq!(pricing.discount_percent, 30);
        assert_eq!(pricing.site_wide_discount, None);
    }

    #[test]
    fn stronger_custom_discount_beats_sitewide() {
        let pricing = compose_calendar_price(
            100.0,
            Some(&PriceValue::Text("£70".into())),
            Some(&sitewide(20.0)),
        );
        assert_eq!(pricing.display_price, "£70");
        assert_eq!(pricing.discount_percent, 30);
        assert!(!pricing.site_wide_applied);
        assert!(pricing.site_wide_discount.is_some());
    }

    #[test]
    fn sitewide_overrides_weaker_custom_discount() {
        let pricing = compose_calendar_price(100.0, Some(&PriceValue::Number(90.0)), Some(&sitewide(25.0)));
        assert_eq!(pricing.display_price, "£75");
        assert_eq!(pricing.discount_percent, 25);
        assert_eq!(pricing.custom_price, Some(90.0));
    }

    #[test]
    fn higher_event_price_is_not_a_discount() {
        let pricing = compose_calendar_price(100.0, Some(&PriceValue::Number(120.0)), None);
        assert_eq!(pricing.display_price, "£120");
        assert_eq!(pricing.custom_price, Some(120.0));
        assert!(!pricing.has_discount);
        assert_eq!(pricing.discount_percent, 0);
    }

    #[test]
    fn equal_string_price_keeps_literal_display() {
        let pricing = compose_calendar_price(100.0, Some(&PriceValue::Text("£100.00".into())), None);
        assert_eq!(pricing.custom_price, None);
        assert_eq!(pricing.display_price, "£100.00");
        assert!(!pricing.has_discount);
    }

    #[test]
    fn inactive_or_zero_discount_is_ignored() {
        let inactive = SiteWideDiscount { active: false, ..sitewide(20.0) };
        let pricing = compose_calendar_price(100.0, None, Some(&inactive));
        assert_eq!(pricing.display_price, "£100");
        assert_eq!(pricing.site_wide_discount, None);

        let pricing = compose_calendar_price(100.0, None, Some(&sitewide(0.0)));
        assert!(!pricing.has_discount);

        let pricing = compose_calendar_price(100.0, None, Some(&sitewide(150.0)));
        assert_eq!(pricing.display_price, "£100");
        assert_eq!(pricing.discount_percent, 0);
        assert!(!pricing.site_wide_applied);
    }

    #[test]
    fn unpriced_course_gets_no_sitewide_discount() {
        let pricing = compose_calendar_price(0.0, None, Some(&sitewide(20.0)));
        assert_eq!(pricing.display_price, "£0");
        assert!(!pricing.has_discount);
    }
}
