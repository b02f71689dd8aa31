use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RegionSummary {
    pub code: String,
    pub name: String,
    pub group: String,
    pub capacity: u32,
    pub threshold: usize,
}

#[derive(Debug, Serialize)]
pub struct SeasonList {
    pub seasons: Vec<String>,
    pub last_updated: Option<String>,
}
