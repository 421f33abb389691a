/// Default quality tiers published for every source asset
pub struct TierInfo {
    pub name: &'static str,
    pub face_count: u32,
    pub resolution: u32,
}

/// Ordered tier table. The first entry is the cheapest tier and is used to
/// measure the shared bounding box.
pub const DEFAULT_TIERS: &[TierInfo] = &[
    TierInfo {
        name: "Thumb",
        face_count: 2000,
        resolution: 512,
    },
    TierInfo {
        name: "High",
        face_count: 15000,
        resolution: 4096,
    },
    TierInfo {
        name: "Medium",
        face_count: 15000,
        resolution: 2048,
    },
    TierInfo {
        name: "Low",
        face_count: 15000,
        resolution: 1024,
    },
];
