//! # IATA Resolver
//!
//! Maps free-text city names, in Latin or Cyrillic script, to a three letter
//! IATA city or airport code. The table is compiled in; unknown cities fall
//! back to the first three characters of the normalized input, which is a
//! best-effort guess and not a validated code.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Forward table: normalized (trimmed, uppercased) name or code to IATA code.
    /// Every code also maps to itself so resolution is idempotent.
    static ref CITY_TO_IATA: HashMap<&'static str, &'static str> = {
        let entries: &[(&str, &str)] = &[
            ("MOSCOW", "MOW"), ("MOSKVA", "MOW"), ("МОСКВА", "MOW"), ("MOW", "MOW"),
            ("SAINT-PETERSBURG", "LED"), ("SAINT PETERSBURG", "LED"), ("ST PETERSBURG", "LED"),
            ("САНКТ-ПЕТЕРБУРГ", "LED"), ("ПЕТЕРБУРГ", "LED"), ("СПБ", "LED"), ("LED", "LED"),
            ("SOCHI", "AER"), ("СОЧИ", "AER"), ("AER", "AER"),
            ("YEKATERINBURG", "SVX"), ("EKATERINBURG", "SVX"), ("ЕКАТЕРИНБУРГ", "SVX"), ("SVX", "SVX"),
            ("KAZAN", "KZN"), ("КАЗАНЬ", "KZN"), ("KZN", "KZN"),
            ("NOVOSIBIRSK", "OVB"), ("НОВОСИБИРСК", "OVB"), ("OVB", "OVB"),
            ("KALININGRAD", "KGD"), ("КАЛИНИНГРАД", "KGD"), ("KGD", "KGD"),
            ("ISTANBUL", "IST"), ("СТАМБУЛ", "IST"), ("IST", "IST"),
            ("MADRID", "MAD"), ("МАДРИД", "MAD"), ("MAD", "MAD"),
            ("BARCELONA", "BCN"), ("БАРСЕЛОНА", "BCN"), ("BCN", "BCN"),
            ("PARIS", "PAR"), ("ПАРИЖ", "PAR"), ("PAR", "PAR"), ("CDG", "CDG"),
            ("LONDON", "LON"), ("ЛОНДОН", "LON"), ("LON", "LON"),
            ("DUBAI", "DXB"), ("ДУБАЙ", "DXB"), ("DXB", "DXB"),
            ("BERLIN", "BER"), ("БЕРЛИН", "BER"), ("BER", "BER"),
            ("ROME", "ROM"), ("РИМ", "ROM"), ("ROM", "ROM"),
            ("TBILISI", "TBS"), ("ТБИЛИСИ", "TBS"), ("TBS", "TBS"),
            ("YEREVAN", "EVN"), ("ЕРЕВАН", "EVN"), ("EVN", "EVN"),
        ];
        entries.iter().copied().collect()
    };

    /// Reverse table used only for display labels after decoding a callback token.
    static ref IATA_TO_CITY: HashMap<&'static str, &'static str> = {
        let entries: &[(&str, &str)] = &[
            ("MOW", "Москва"),
            ("LED", "Санкт-Петербург"),
            ("AER", "Сочи"),
            ("SVX", "Екатеринбург"),
            ("KZN", "Казань"),
            ("OVB", "Новосибирск"),
            ("KGD", "Калининград"),
            ("IST", "Стамбул"),
            ("MAD", "Мадрид"),
            ("BCN", "Барселона"),
            ("PAR", "Париж"),
            ("LON", "Лондон"),
            ("DXB", "Дубай"),
        ];
        entries.iter().copied().collect()
    };
}

/// Normalize a city name the way both lookup and fallback expect it
fn normalize(city: &str) -> String {
    city.trim().to_uppercase()
}

/// Resolve a city name to an IATA code.
///
/// Total: never fails. Unknown names yield their first three normalized
/// characters (fewer if the input is shorter), counted in chars so Cyrillic
/// input is never split mid-codepoint.
pub fn resolve(city: &str) -> String {
    let normalized = normalize(city);
    match CITY_TO_IATA.get(normalized.as_str()) {
        Some(code) => (*code).to_string(),
        None => normalized.chars().take(3).collect(),
    }
}

/// Best-effort display label for a code; returns the code itself on a miss.
pub fn reverse_resolve(code: &str) -> String {
    IATA_TO_CITY
        .get(code)
        .map(|city| (*city).to_string())
        .unwrap_or_else(|| code.to_string())
}

/// All names known to the forward table (used by tests and diagnostics)
pub fn known_names() -> impl Iterator<Item = &'static str> {
    CITY_TO_IATA.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_latin_and_cyrillic() {
        assert_eq!(resolve("Moscow"), "MOW");
        assert_eq!(resolve("  москва "), "MOW");
        assert_eq!(resolve("Санкт-Петербург"), "LED");
        assert_eq!(resolve("paris"), "PAR");
    }

    #[test]
    fn test_resolve_codes_map_to_themselves() {
        assert_eq!(resolve("LED"), "LED");
        assert_eq!(resolve("kzn"), "KZN");
    }

    #[test]
    fn test_resolve_fallback_takes_first_three_chars() {
        assert_eq!(resolve("Novgorod"), "NOV");
        assert_eq!(resolve("Тверь"), "ТВЕ");
        assert_eq!(resolve("Ob"), "OB");
        assert_eq!(resolve(""), "");
    }

    #[test]
    fn test_resolve_is_idempotent_for_known_names() {
        for name in known_names() {
            let once = resolve(name);
            assert_eq!(resolve(&once), once, "not idempotent for {name}");
        }
    }

    #[test]
    fn test_reverse_resolve() {
        assert_eq!(reverse_resolve("MOW"), "Москва");
        assert_eq!(reverse_resolve("XYZ"), "XYZ");
    }
}
