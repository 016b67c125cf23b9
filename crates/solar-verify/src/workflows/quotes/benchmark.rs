use serde::Serialize;

use super::grade::LetterGrade;

/// Catalogue identifier for batteries that are not in the table.
pub const OTHER_BATTERY_ID: &str = "other";

/// Min/max fair price for one unit (a kWp of solar, a kWh of storage, or an installer's kW).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBand {
    pub min: f64,
    pub max: f64,
}

impl PriceBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// One row of a tier table. Tiers are ordered by ascending `min`; the lower edge is inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTier {
    pub grade: LetterGrade,
    pub min: f64,
    pub description: String,
}

/// Reference pricing for a catalogue battery, installed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryBenchmark {
    pub id: String,
    pub label: String,
    pub capacity_kwh: f64,
    pub fair_price: PriceBand,
}

impl BatteryBenchmark {
    fn matches(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        self.id.eq_ignore_ascii_case(identifier) || self.label.eq_ignore_ascii_case(identifier)
    }
}

/// Per-kW band for a class of installer, published for comparison only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallerBand {
    pub installer_type: String,
    pub price_per_kw: PriceBand,
    pub description: String,
}

/// Thresholds feeding the multi-signal classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalThresholds {
    pub solar_low_per_kwp: f64,
    pub solar_high_per_kwp: f64,
    pub battery_low_per_kwh: f64,
    pub battery_high_per_kwh: f64,
    /// Fraction below the expected mid-market total that counts as suspiciously cheap.
    pub underpriced_margin: f64,
    /// Fraction above the expected mid-market total that counts as overpriced.
    pub overpriced_margin: f64,
}

/// A named, self-contained set of benchmark data and grading thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ruleset {
    pub name: String,
    pub solar_market_per_kwp: PriceBand,
    pub battery_market_per_kwh: PriceBand,
    pub solar_tiers: Vec<PriceTier>,
    pub battery_tiers: Vec<PriceTier>,
    pub signals: SignalThresholds,
    /// Flat fee charged on quotes that include a battery.
    pub installation_fee: f64,
    pub custom_battery_per_kwh: f64,
    pub unknown_battery_unit_cost: f64,
    pub batteries: Vec<BatteryBenchmark>,
    pub installers: Vec<InstallerBand>,
}

/// Result of resolving a quoted battery identifier against the catalogue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryLookup<'a> {
    Catalogue(&'a BatteryBenchmark),
    Custom,
    Unknown,
}

impl Ruleset {
    pub const CANONICAL: &'static str = "uk-2025";
    pub const LEGACY: &'static str = "uk-2024-legacy";

    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            Self::CANONICAL => Some(Self::uk_2025()),
            Self::LEGACY => Some(Self::uk_2024_legacy()),
            _ => None,
        }
    }

    pub fn uk_2025() -> Self {
        Self {
            name: Self::CANONICAL.to_string(),
            solar_market_per_kwp: PriceBand::new(1000.0, 1900.0),
            battery_market_per_kwh: PriceBand::new(400.0, 850.0),
            solar_tiers: tiers(&[
                (LetterGrade::APlus, 600.0, "Excellent value - very competitive pricing"),
                (LetterGrade::A, 1000.0, "Good value - fair pricing"),
                (LetterGrade::B, 1300.0, "Reasonable pricing"),
                (LetterGrade::C, 1600.0, "Average pricing - room for negotiation"),
                (LetterGrade::D, 1900.0, "Below average - consider getting more quotes"),
                (LetterGrade::F, 2400.0, "Overpriced - significantly above market rate"),
            ]),
            battery_tiers: tiers(&[
                (LetterGrade::APlus, 300.0, "Excellent storage value"),
                (LetterGrade::A, 450.0, "Good storage value"),
                (LetterGrade::B, 600.0, "Reasonable storage pricing"),
                (LetterGrade::C, 750.0, "Average storage pricing"),
                (LetterGrade::D, 900.0, "Expensive storage"),
                (LetterGrade::F, 1100.0, "Storage significantly above market rate"),
            ]),
            signals: SignalThresholds {
                solar_low_per_kwp: 900.0,
                solar_high_per_kwp: 1900.0,
                battery_low_per_kwh: 350.0,
                battery_high_per_kwh: 900.0,
                underpriced_margin: 0.30,
                overpriced_margin: 0.20,
            },
            installation_fee: 1200.0,
            custom_battery_per_kwh: 500.0,
            unknown_battery_unit_cost: 4000.0,
            batteries: battery_catalogue(),
            installers: installer_bands(),
        }
    }

    /// The early flat table where anything under £800/kW earned the top grade.
    pub fn uk_2024_legacy() -> Self {
        Self {
            name: Self::LEGACY.to_string(),
            solar_tiers: tiers(&[
                (LetterGrade::APlus, 0.0, "Excellent value - very competitive pricing"),
                (LetterGrade::A, 800.0, "Good value - fair pricing"),
                (LetterGrade::B, 1000.0, "Reasonable pricing"),
                (LetterGrade::C, 1200.0, "Average pricing - room for negotiation"),
                (LetterGrade::D, 1500.0, "Expensive - consider getting more quotes"),
            ]),
            ..Self::uk_2025()
        }
    }

    pub fn find_battery(&self, identifier: Option<&str>) -> BatteryLookup<'_> {
        let Some(identifier) = identifier else {
            return BatteryLookup::Unknown;
        };
        if identifier.trim().eq_ignore_ascii_case(OTHER_BATTERY_ID)
            || identifier.trim().to_ascii_lowercase().starts_with("other (")
        {
            return BatteryLookup::Custom;
        }
        self.batteries
            .iter()
            .find(|battery| battery.matches(identifier))
            .map(BatteryLookup::Catalogue)
            .unwrap_or(BatteryLookup::Unknown)
    }
}

fn tiers(rows: &[(LetterGrade, f64, &str)]) -> Vec<PriceTier> {
    rows.iter()
        .map(|(grade, min, description)| PriceTier {
            grade: *grade,
            min: *min,
            description: description.to_string(),
        })
        .collect()
}

fn battery_catalogue() -> Vec<BatteryBenchmark> {
    [
        ("tesla-powerwall-3", "Tesla Powerwall 3 (13.5kWh)", 13.5, 7500.0, 9500.0),
        ("tesla-powerwall-2", "Tesla Powerwall 2 (13.5kWh)", 13.5, 7000.0, 9000.0),
        ("enphase-iq-5p", "Enphase IQ Battery 5P (5kWh)", 5.0, 3500.0, 4500.0),
        ("enphase-iq-10", "Enphase IQ Battery 10 (10.1kWh)", 10.1, 6500.0, 8000.0),
        ("solaredge-home", "SolarEdge Home Battery (9.7kWh)", 9.7, 5500.0, 7000.0),
        ("lg-resu10h", "LG Chem RESU10H (9.8kWh)", 9.8, 5000.0, 6500.0),
        ("lg-resu16h", "LG Chem RESU16H (16kWh)", 16.0, 7500.0, 9500.0),
        ("pylontech-us3000c", "Pylontech US3000C (3.5kWh)", 3.5, 1200.0, 1800.0),
        ("pylontech-us5000", "Pylontech US5000 (4.8kWh)", 4.8, 1600.0, 2300.0),
        ("byd-lvs-4", "BYD Battery-Box Premium LVS (4kWh)", 4.0, 2000.0, 2800.0),
        ("huawei-luna2000-5", "Huawei LUNA2000 (5kWh)", 5.0, 2500.0, 3300.0),
        ("alpha-ess-smile-b3", "Alpha ESS SMILE-B3 (2.9kWh)", 2.9, 1600.0, 2200.0),
        ("growatt-ark-2-5h", "Growatt ARK-2.5H-A1 (2.5kWh)", 2.5, 1200.0, 1700.0),
        ("victron-lithium-5", "Victron Energy Lithium (5kWh)", 5.0, 2800.0, 3600.0),
        ("sonnen-eco-8", "Sonnen eco 8 (8kWh)", 8.0, 5500.0, 7000.0),
        ("givenergy-9-5", "GivEnergy Giv-Bat 9.5 (9.5kWh)", 9.5, 5000.0, 6500.0),
        ("fox-ess-ep11", "Fox ESS EP11 (20.7kWh)", 20.7, 9500.0, 12500.0),
        ("powerwall-alternative-10", "Powerwall Alternative (10kWh)", 10.0, 4500.0, 6000.0),
        ("generic-lithium-5", "Generic Lithium Battery (5kWh)", 5.0, 1800.0, 2600.0),
    ]
    .into_iter()
    .map(|(id, label, capacity_kwh, min, max)| BatteryBenchmark {
        id: id.to_string(),
        label: label.to_string(),
        capacity_kwh,
        fair_price: PriceBand::new(min, max),
    })
    .collect()
}

fn installer_bands() -> Vec<InstallerBand> {
    [
        ("Volume", 1200.0, 1600.0, "Large national installers"),
        ("Local", 1400.0, 2200.0, "Local and regional installers"),
        ("Premium", 2000.0, 2800.0, "Premium installers with high-end components"),
    ]
    .into_iter()
    .map(|(installer_type, min, max, description)| InstallerBand {
        installer_type: installer_type.to_string(),
        price_per_kw: PriceBand::new(min, max),
        description: description.to_string(),
    })
    .collect()
}

/// Source of benchmark data. Swapping the implementation changes prices, never the
/// classification logic.
pub trait BenchmarkSource: Send + Sync {
    fn ruleset(&self) -> &Ruleset;
}

/// Benchmark data compiled into the binary.
#[derive(Debug, Clone)]
pub struct StaticBenchmarks {
    ruleset: Ruleset,
}

impl StaticBenchmarks {
    pub fn new(ruleset: Ruleset) -> Self {
        Self { ruleset }
    }

    pub fn named(name: &str) -> Option<Self> {
        Ruleset::named(name).map(Self::new)
    }
}

impl Default for StaticBenchmarks {
    fn default() -> Self {
        Self::new(Ruleset::uk_2025())
    }
}

impl BenchmarkSource for StaticBenchmarks {
    fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_and_non_overlapping() {
        for ruleset in [Ruleset::uk_2025(), Ruleset::uk_2024_legacy()] {
            for table in [&ruleset.solar_tiers, &ruleset.battery_tiers] {
                assert!(table.windows(2).all(|pair| pair[0].min < pair[1].min));
                assert!(table.windows(2).all(|pair| pair[0].grade < pair[1].grade));
            }
        }
    }

    #[test]
    fn battery_lookup_matches_id_label_and_sentinel() {
        let ruleset = Ruleset::uk_2025();
        assert!(matches!(
            ruleset.find_battery(Some("TESLA-POWERWALL-3")),
            BatteryLookup::Catalogue(battery) if battery.capacity_kwh == 13.5
        ));
        assert!(matches!(
            ruleset.find_battery(Some("LG Chem RESU16H (16kWh)")),
            BatteryLookup::Catalogue(battery) if battery.id == "lg-resu16h"
        ));
        assert_eq!(ruleset.find_battery(Some("other")), BatteryLookup::Custom);
        assert_eq!(
            ruleset.find_battery(Some("Other (specify capacity)")),
            BatteryLookup::Custom
        );
        assert_eq!(ruleset.find_battery(Some("Acme 9000")), BatteryLookup::Unknown);
        assert_eq!(ruleset.find_battery(None), BatteryLookup::Unknown);
    }

    #[test]
    fn named_rulesets_resolve() {
        assert_eq!(
            Ruleset::named("UK-2025").map(|ruleset| ruleset.name),
            Some("uk-2025".to_string())
        );
        let legacy = Ruleset::named("uk-2024-legacy").expect("legacy ruleset");
        assert_eq!(legacy.solar_tiers[1].min, 800.0);
        assert!(Ruleset::named("uk-1999").is_none());
    }
}
