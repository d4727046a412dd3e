//! Smart-filter patterns: non-site categories, modern-era keywords and the
//! name keywords used to infer a category during the smart scan.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, StandardsError};

const NATURAL: &[&str] = &[
    "동물", "식물", "광물", "지질", "도래지", "번식지", "서식지", "자생지", "수림지",
    "거석기념물", "노거수", "조류", "포유류",
];
const INTANGIBLE_OR_MOVABLE: &[&str] = &[
    "공예기술", "동산문화유산", "음악", "의식", "음식", "무형유산", "연극", "무용", "공예",
    "서적", "전적", "조각", "회화", "예술", "동산",
];
const STELES: &[&str] = &["비갈", "묘비", "선정비", "신도비", "충효비", "공덕비", "순수비"];
const MODERN_ERAS: &[&str] = &["근대", "일제강점기", "대한제국", "현대"];

/// A scan category and the name fragments that imply it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryKeywords {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SmartFilterPatterns {
    pub excluded_categories: Vec<String>,
    pub modern_era_keywords: Vec<String>,
    #[serde(rename = "category")]
    pub categories: Vec<CategoryKeywords>,
}

impl Default for SmartFilterPatterns {
    fn default() -> Self {
        let owned = |values: &[&str]| values.iter().map(|v| (*v).to_string()).collect::<Vec<_>>();
        let category = |name: &str, keywords: &[&str]| CategoryKeywords {
            name: name.to_string(),
            keywords: owned(keywords),
        };
        Self {
            excluded_categories: owned(&[NATURAL, INTANGIBLE_OR_MOVABLE, STELES].concat()),
            modern_era_keywords: owned(MODERN_ERAS),
            categories: vec![
                category("고분", &["고분", "분묘", "묘역", "석곽묘", "토광묘"]),
                category("사지", &["사지", "사찰"]),
                category("성곽", &["산성", "읍성", "토성", "성곽", "성지"]),
                category("요지", &["요지", "가마"]),
                category("주거지", &["주거지", "취락"]),
                category("건물지", &["건물지"]),
                category("패총", &["패총"]),
                category("봉수", &["봉수"]),
                category("유물산포지", &["산포지"]),
            ],
        }
    }
}

impl SmartFilterPatterns {
    /// Non-site category matched by `value` (exact or contained).
    pub fn non_site_category(&self, value: &str) -> Option<&str> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        self.excluded_categories
            .iter()
            .find(|category| category.as_str() == value || value.contains(category.as_str()))
            .map(String::as_str)
    }

    /// Modern-era keyword contained in `era`.
    pub fn modern_keyword(&self, era: &str) -> Option<&str> {
        self.modern_era_keywords
            .iter()
            .find(|keyword| era.contains(keyword.as_str()))
            .map(String::as_str)
    }

    /// Category implied by a keyword in the site name.
    pub fn infer_category(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|category| category.keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|category| category.name.as_str())
    }
}

pub fn parse_filter(text: &str, path: &Path) -> Result<SmartFilterPatterns> {
    toml::from_str(text).map_err(|source| StandardsError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_filter(path: &Path) -> Result<SmartFilterPatterns> {
    let text = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
    parse_filter(&text, path)
}
