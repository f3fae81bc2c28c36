//! Crop registry: growth stages, water demand, pH ranges, seasonal N-P-K
//! requirements and baseline yields
//!
//! Static agronomic reference data consulted by the risk scorers and the
//! prompt builder. Lookups are case-insensitive and fall back to a generic
//! profile for crops the registry does not know.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Daily water requirement when the crop or stage is unknown (mm/day)
pub const DEFAULT_WATER_MM_PER_DAY: f64 = 5.0;

/// Inclusive optimal range for a soil parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimalRange {
    pub min: f64,
    pub max: f64,
}

impl OptimalRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Signed distance outside the range: negative below, positive above, 0 inside
    pub fn deviation(&self, value: f64) -> f64 {
        if value < self.min {
            value - self.min
        } else if value > self.max {
            value - self.max
        } else {
            0.0
        }
    }
}

/// Soil-test optimal ranges (kg/ha for nutrients)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilTargets {
    pub nitrogen: OptimalRange,
    pub phosphorus: OptimalRange,
    pub potassium: OptimalRange,
    pub ph: OptimalRange,
}

const GENERIC_NITROGEN: OptimalRange = OptimalRange::new(280.0, 450.0);
const GENERIC_PHOSPHORUS: OptimalRange = OptimalRange::new(60.0, 110.0);
const GENERIC_POTASSIUM: OptimalRange = OptimalRange::new(280.0, 450.0);
const GENERIC_PH: OptimalRange = OptimalRange::new(6.0, 7.0);

/// Seasonal nutrient application a crop needs (kg/ha of N, P2O5, K2O)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NpkRequirement {
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

const fn npk(n: f64, p: f64, k: f64) -> Option<NpkRequirement> {
    Some(NpkRequirement { n, p, k })
}

/// One growth stage: `[start_day, end_day)` since planting, water demand in mm/day
#[derive(Debug, Clone, Copy)]
pub struct GrowthStage {
    pub name: &'static str,
    pub start_day: u32,
    pub end_day: u32,
    pub water_mm_per_day: f64,
}

const fn stage(name: &'static str, start_day: u32, end_day: u32, water_mm_per_day: f64) -> GrowthStage {
    GrowthStage { name, start_day, end_day, water_mm_per_day }
}

/// Share of the crop cycle at which each generic stage ends
const GENERIC_STAGE_FRACTIONS: [(&str, f64); 3] = [
    ("early_growth", 0.12),
    ("vegetative", 0.50),
    ("reproductive", 0.75),
];

/// Reference profile of one crop
#[derive(Debug, Clone, Copy)]
pub struct CropProfile {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Detailed stage calendar; empty means stages are derived from `growth_days`
    pub stages: &'static [GrowthStage],
    pub growth_days: u32,
    pub ph: OptimalRange,
    pub npk: Option<NpkRequirement>,
    pub baseline_yield_t_ha: Option<f64>,
}

/// Registry entry without a stage calendar or yield baseline
const fn crop(
    name: &'static str,
    aliases: &'static [&'static str],
    npk: Option<NpkRequirement>,
    ph: (f64, f64),
    growth_days: u32,
) -> CropProfile {
    CropProfile {
        name,
        aliases,
        stages: &[],
        growth_days,
        ph: OptimalRange::new(ph.0, ph.1),
        npk,
        baseline_yield_t_ha: None,
    }
}

impl CropProfile {
    pub fn soil_targets(&self) -> SoilTargets {
        SoilTargets {
            nitrogen: GENERIC_NITROGEN,
            phosphorus: GENERIC_PHOSPHORUS,
            potassium: GENERIC_POTASSIUM,
            ph: self.ph,
        }
    }

    /// Stage for the given age; past the last stage the crop stays at maturity
    pub fn stage_at(&self, days_since_planting: u32) -> &'static str {
        if self.stages.is_empty() {
            let progress = f64::from(days_since_planting) / f64::from(self.growth_days.max(1));
            return GENERIC_STAGE_FRACTIONS
                .iter()
                .find(|(_, end)| progress < *end)
                .map_or("maturity", |(name, _)| *name);
        }
        self.stages
            .iter()
            .find(|s| days_since_planting >= s.start_day && days_since_planting < s.end_day)
            .or_else(|| self.stages.last())
            .map(|s| s.name)
            .unwrap_or("maturity")
    }

    pub fn water_requirement(&self, stage_name: &str) -> f64 {
        self.stages
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(stage_name))
            .map(|s| s.water_mm_per_day)
            .unwrap_or(DEFAULT_WATER_MM_PER_DAY)
    }
}

static CROPS: &[CropProfile] = &[
    // Crops with a full stage calendar and a yield baseline
    CropProfile {
        name: "tomato",
        aliases: &[],
        stages: &[
            stage("germination", 0, 14, 3.0),
            stage("seedling", 14, 30, 4.0),
            stage("vegetative", 30, 50, 5.0),
            stage("flowering", 50, 70, 6.0),
            stage("fruiting", 70, 90, 7.0),
            stage("maturity", 90, 120, 5.0),
        ],
        growth_days: 90,
        ph: OptimalRange::new(6.0, 7.0),
        npk: npk(120.0, 60.0, 80.0),
        baseline_yield_t_ha: Some(35.0),
    },
    CropProfile {
        name: "corn",
        aliases: &["maize"],
        stages: &[
            stage("germination", 0, 10, 3.0),
            stage("seedling", 10, 25, 4.0),
            stage("vegetative", 25, 55, 5.0),
            stage("flowering", 55, 75, 7.0),
            stage("grain_fill", 75, 100, 6.0),
            stage("maturity", 100, 130, 4.0),
        ],
        growth_days: 90,
        ph: OptimalRange::new(5.5, 7.5),
        npk: npk(120.0, 60.0, 40.0),
        baseline_yield_t_ha: Some(5.5),
    },
    CropProfile {
        name: "wheat",
        aliases: &[],
        stages: &[
            stage("germination", 0, 14, 2.0),
            stage("tillering", 14, 40, 3.0),
            stage("stem_extension", 40, 70, 4.0),
            stage("heading", 70, 90, 5.0),
            stage("grain_fill", 90, 110, 4.0),
            stage("maturity", 110, 140, 2.0),
        ],
        growth_days: 120,
        ph: OptimalRange::new(6.0, 7.5),
        npk: npk(120.0, 60.0, 40.0),
        baseline_yield_t_ha: Some(4.0),
    },
    CropProfile {
        name: "rice",
        aliases: &["paddy"],
        stages: &[
            stage("germination", 0, 15, 8.0),
            stage("seedling", 15, 35, 9.0),
            stage("tillering", 35, 60, 10.0),
            stage("panicle_initiation", 60, 80, 11.0),
            stage("flowering", 80, 100, 10.0),
            stage("maturity", 100, 130, 8.0),
        ],
        growth_days: 120,
        ph: OptimalRange::new(5.5, 6.5),
        npk: npk(120.0, 60.0, 40.0),
        baseline_yield_t_ha: Some(4.5),
    },
    CropProfile {
        name: "potato",
        aliases: &[],
        stages: &[
            stage("sprouting", 0, 14, 3.0),
            stage("vegetative", 14, 40, 4.0),
            stage("tuber_initiation", 40, 60, 5.0),
            stage("tuber_bulking", 60, 90, 6.0),
            stage("maturity", 90, 120, 4.0),
        ],
        growth_days: 120,
        ph: OptimalRange::new(5.5, 6.5),
        npk: npk(150.0, 80.0, 100.0),
        baseline_yield_t_ha: Some(25.0),
    },
    // Vegetables
    crop("onion", &[], npk(100.0, 50.0, 60.0), (6.0, 7.0), 150),
    crop("cabbage", &[], npk(120.0, 60.0, 80.0), (6.0, 7.5), 90),
    crop("cauliflower", &[], npk(120.0, 60.0, 80.0), (6.0, 7.0), 100),
    crop("brinjal", &["eggplant", "aubergine"], npk(100.0, 50.0, 75.0), (6.0, 7.0), 120),
    crop("okra", &["ladyfinger", "bhindi"], npk(80.0, 40.0, 60.0), (6.0, 7.0), 60),
    crop("carrot", &[], npk(100.0, 50.0, 75.0), (6.0, 7.0), 90),
    crop("radish", &[], npk(80.0, 40.0, 60.0), (6.0, 7.0), 45),
    crop("beetroot", &["beet"], npk(100.0, 50.0, 75.0), (6.0, 7.5), 90),
    crop("pumpkin", &[], npk(80.0, 40.0, 60.0), (6.0, 7.0), 120),
    crop("bitter gourd", &["karela"], npk(80.0, 40.0, 60.0), (6.0, 7.0), 60),
    crop("bottle gourd", &["lauki"], npk(80.0, 40.0, 60.0), (6.0, 7.0), 75),
    crop("cucumber", &[], npk(80.0, 40.0, 60.0), (6.0, 7.0), 60),
    crop("spinach", &[], npk(100.0, 50.0, 75.0), (6.0, 7.0), 45),
    crop("coriander", &[], npk(60.0, 30.0, 40.0), (6.0, 7.0), 45),
    crop("fenugreek", &["methi"], npk(40.0, 20.0, 30.0), (6.0, 7.0), 90),
    crop("green peas", &["peas"], npk(20.0, 60.0, 40.0), (6.0, 7.0), 90),
    crop("french beans", &["beans"], npk(25.0, 50.0, 50.0), (6.0, 7.0), 60),
    crop("cluster beans", &["guar"], npk(20.0, 40.0, 30.0), (6.0, 8.0), 90),
    // Fruits
    crop("mango", &[], npk(500.0, 250.0, 500.0), (5.5, 7.5), 365),
    crop("banana", &[], npk(200.0, 60.0, 300.0), (6.0, 7.5), 365),
    crop("papaya", &[], npk(200.0, 100.0, 200.0), (6.0, 7.0), 365),
    crop("guava", &[], npk(300.0, 150.0, 300.0), (6.0, 7.5), 365),
    crop("pomegranate", &[], npk(250.0, 125.0, 250.0), (6.5, 7.5), 365),
    crop("grapes", &["grape"], npk(300.0, 150.0, 300.0), (6.0, 7.5), 365),
    crop("orange", &[], npk(400.0, 200.0, 400.0), (6.0, 7.5), 365),
    crop("apple", &[], npk(300.0, 150.0, 300.0), (5.5, 6.5), 365),
    crop("watermelon", &[], npk(100.0, 50.0, 100.0), (6.0, 7.0), 90),
    crop("muskmelon", &[], npk(100.0, 50.0, 100.0), (6.0, 7.0), 90),
    // Cereals
    crop("bajra", &["pearl millet"], npk(80.0, 40.0, 40.0), (6.0, 7.5), 75),
    crop("jowar", &["sorghum"], npk(80.0, 40.0, 40.0), (6.0, 8.0), 120),
    crop("barley", &[], npk(60.0, 30.0, 30.0), (6.0, 7.5), 120),
    crop("oats", &[], npk(60.0, 30.0, 30.0), (6.0, 7.0), 90),
    crop("ragi", &["finger millet"], npk(50.0, 40.0, 25.0), (5.0, 7.0), 120),
    // Pulses
    crop("chickpea", &["chana"], npk(20.0, 60.0, 40.0), (6.0, 7.5), 120),
    crop("pigeon pea", &["arhar", "tur"], npk(20.0, 50.0, 30.0), (6.0, 7.5), 150),
    crop("green gram", &["mung bean", "moong"], npk(15.0, 40.0, 20.0), (6.0, 7.5), 60),
    crop("black gram", &["urad"], npk(15.0, 40.0, 20.0), (6.0, 7.5), 75),
    crop("lentil", &["masoor"], npk(20.0, 50.0, 25.0), (6.0, 7.5), 120),
    crop("red gram", &[], npk(20.0, 50.0, 30.0), (6.0, 7.5), 180),
    crop("soybean", &["soya"], npk(30.0, 80.0, 40.0), (6.0, 7.0), 90),
    // Oilseeds
    crop("groundnut", &["peanut"], npk(25.0, 50.0, 75.0), (6.0, 7.0), 120),
    crop("mustard", &["rapeseed"], npk(80.0, 40.0, 40.0), (6.0, 7.5), 120),
    crop("sunflower", &[], npk(60.0, 80.0, 40.0), (6.0, 7.5), 90),
    crop("sesame", &["til"], npk(40.0, 60.0, 30.0), (6.0, 7.5), 90),
    crop("safflower", &[], npk(60.0, 30.0, 30.0), (6.0, 7.5), 120),
    crop("castor", &[], npk(50.0, 25.0, 25.0), (6.0, 7.5), 150),
    crop("linseed", &["flax"], npk(40.0, 30.0, 20.0), (6.0, 7.5), 120),
    // Spices
    crop("turmeric", &[], npk(60.0, 50.0, 120.0), (5.5, 7.5), 240),
    crop("chili", &["chilli"], npk(100.0, 50.0, 50.0), (6.0, 7.0), 150),
    crop("ginger", &[], npk(75.0, 50.0, 50.0), (6.0, 6.5), 240),
    crop("garlic", &[], npk(60.0, 40.0, 40.0), (6.0, 7.0), 150),
    crop("black pepper", &[], npk(50.0, 50.0, 120.0), (5.5, 6.5), 365),
    crop("cardamom", &[], npk(75.0, 75.0, 150.0), (5.0, 6.5), 365),
    crop("cumin", &["jeera"], npk(40.0, 30.0, 20.0), (6.5, 8.0), 120),
    crop("coriander seed", &[], npk(60.0, 30.0, 40.0), (6.0, 7.0), 90),
    // Commercial and fibre crops
    crop("sugarcane", &[], npk(150.0, 60.0, 60.0), (6.0, 7.5), 365),
    crop("cotton", &[], npk(120.0, 60.0, 60.0), (6.0, 8.0), 180),
    crop("jute", &[], npk(60.0, 30.0, 30.0), (6.0, 7.5), 120),
    crop("tea", &[], npk(80.0, 40.0, 40.0), (4.5, 5.5), 365),
    crop("coffee", &[], npk(100.0, 50.0, 100.0), (6.0, 6.5), 365),
];

/// Stages used for crops outside the registry
static GENERIC_STAGES: &[GrowthStage] = &[
    stage("early_growth", 0, 14, DEFAULT_WATER_MM_PER_DAY),
    stage("vegetative", 14, 60, DEFAULT_WATER_MM_PER_DAY),
    stage("reproductive", 60, 90, DEFAULT_WATER_MM_PER_DAY),
    stage("maturity", 90, u32::MAX, DEFAULT_WATER_MM_PER_DAY),
];

static GENERIC_CROP: CropProfile = CropProfile {
    name: "generic",
    aliases: &[],
    stages: GENERIC_STAGES,
    growth_days: 120,
    ph: GENERIC_PH,
    npk: None,
    baseline_yield_t_ha: None,
};

/// Look up a crop by name or alias. Underscores and hyphens match spaces.
pub fn lookup(name: &str) -> Option<&'static CropProfile> {
    let name = name.trim().replace(['_', '-'], " ");
    CROPS.iter().find(|c| {
        c.name.eq_ignore_ascii_case(&name) || c.aliases.iter().any(|a| a.eq_ignore_ascii_case(&name))
    })
}

/// Registry profile, or the generic profile when the crop is unknown or absent
pub fn profile_or_generic(name: Option<&str>) -> &'static CropProfile {
    name.and_then(lookup).unwrap_or(&GENERIC_CROP)
}

// ============================================================================
// Disease lethality
// ============================================================================

/// How damaging a disease class is per unit of affected area
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LethalityTier {
    Mild,
    Moderate,
    High,
    Severe,
}

impl LethalityTier {
    pub fn multiplier(self) -> f64 {
        match self {
            LethalityTier::Mild => 0.75,
            LethalityTier::Moderate => 1.0,
            LethalityTier::High => 1.25,
            LethalityTier::Severe => 1.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LethalityTier::Mild => "mild",
            LethalityTier::Moderate => "moderate",
            LethalityTier::High => "high",
            LethalityTier::Severe => "severe",
        }
    }
}

/// Keyword table, checked in order; first match wins
static LETHALITY_KEYWORDS: &[(&str, LethalityTier)] = &[
    ("late blight", LethalityTier::Severe),
    ("late_blight", LethalityTier::Severe),
    ("blast", LethalityTier::Severe),
    ("virus", LethalityTier::Severe),
    ("bacterial wilt", LethalityTier::Severe),
    ("greening", LethalityTier::Severe),
    ("blight", LethalityTier::High),
    ("wilt", LethalityTier::High),
    ("rot", LethalityTier::High),
    ("rust", LethalityTier::High),
    ("scab", LethalityTier::Moderate),
    ("spot", LethalityTier::Moderate),
    ("mold", LethalityTier::Moderate),
    ("mildew", LethalityTier::Mild),
    ("mite", LethalityTier::Mild),
];

/// Lethality tier for a disease class label; unknown classes are moderate
pub fn lethality_tier(disease_class: &str) -> LethalityTier {
    let lowered = disease_class.to_ascii_lowercase();
    LETHALITY_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, tier)| *tier)
        .unwrap_or(LethalityTier::Moderate)
}

/// Whether a disease class label denotes a healthy plant
pub fn is_healthy_class(disease_class: &str) -> bool {
    disease_class.to_ascii_lowercase().contains("healthy")
}

// ============================================================================
// Season
// ============================================================================

/// Calendar season by month (northern-hemisphere convention)
pub fn season_for(date: NaiveDate) -> &'static str {
    match date.month() {
        3..=5 => "Spring",
        6..=8 => "Summer",
        9..=11 => "Fall",
        _ => "Winter",
    }
}
