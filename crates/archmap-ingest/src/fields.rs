//! Conventional field-name discovery across heterogeneous source layers.

use archmap_model::Layer;

/// Site name variants, in priority order.
pub const NAME_KEYWORDS: &[&str] = &["유적명", "명칭", "NAME", "SITE", "TITLE"];
/// Designated heritage name.
pub const HERITAGE_NAME_KEYWORDS: &[&str] = &["국가유산명", "문화재명", "지정명칭"];
/// Survey or construction project name.
pub const PROJECT_KEYWORDS: &[&str] = &["사업명", "조사명", "공사명", "PROJECT"];
pub const ADDRESS_KEYWORDS: &[&str] = &["주소", "지번", "소재지", "ADDR", "LOC"];
pub const AREA_KEYWORDS: &[&str] = &["면적", "AREA", "SHAPE_AREA"];
/// Site category or character.
pub const TYPE_KEYWORDS: &[&str] = &["유적종류", "종류", "성격", "구분", "TYPE"];
/// Zone boundary name.
pub const ZONE_KEYWORDS: &[&str] = &["구역명", "구역", "NAME"];
/// Layer-name fragments marking designated heritage sources.
pub const DESIGNATED_LAYER_KEYWORDS: &[&str] = &["국가지정", "시도지정", "등록", "지정", "문화유산"];

/// First field of `fields` matching a keyword.
///
/// Keywords are tried in order; a field matches when its upper-cased name
/// contains the upper-cased keyword.
pub fn find_field<'a, I>(fields: I, keywords: &[&str]) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
    I::IntoIter: Clone,
{
    let fields = fields.into_iter();
    keywords.iter().find_map(|keyword| {
        let keyword = keyword.to_uppercase();
        fields
            .clone()
            .find(|field| field.to_uppercase().contains(&keyword))
            .cloned()
    })
}

/// Resolved source fields of one heritage layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    pub name: Option<String>,
    pub heritage_name: Option<String>,
    pub project: Option<String>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub category: Option<String>,
}

impl FieldMap {
    pub fn resolve(layer: &Layer) -> Self {
        let fields = &layer.fields;
        let name = find_field(fields, NAME_KEYWORDS);
        // "문화재명칭" matches both the name and the heritage keywords.
        let distinct = |found: Option<String>| found.filter(|field| Some(field) != name.as_ref());
        Self {
            heritage_name: distinct(find_field(fields, HERITAGE_NAME_KEYWORDS)),
            project: distinct(find_field(fields, PROJECT_KEYWORDS)),
            address: find_field(fields, ADDRESS_KEYWORDS),
            area: find_field(fields, AREA_KEYWORDS),
            category: find_field(fields, TYPE_KEYWORDS),
            name,
        }
    }
}

/// True when the layer name marks a designated heritage source.
pub fn is_designated_layer(layer_name: &str) -> bool {
    DESIGNATED_LAYER_KEYWORDS
        .iter()
        .any(|keyword| layer_name.contains(keyword))
}
