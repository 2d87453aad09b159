use serde::Serialize;

use crate::model::ids::{DifficultyId, DomainId, FormatId, NicheId, SubDomainId};
use crate::model::question::FormatKind;

// Read-only reference data: domain → sub-domain → niche → difficulty → format.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(rename = "domainID")]
    pub id: DomainId,
    #[serde(rename = "domainName")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubDomain {
    #[serde(rename = "subDomainID")]
    pub id: SubDomainId,
    #[serde(rename = "subDomainName")]
    pub name: String,
    #[serde(rename = "domainID")]
    pub domain_id: DomainId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Niche {
    #[serde(rename = "nicheID")]
    pub id: NicheId,
    #[serde(rename = "nicheName")]
    pub name: String,
    #[serde(rename = "subDomainID")]
    pub sub_domain_id: SubDomainId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyLevel {
    #[serde(rename = "difficultyLevelID")]
    pub id: DifficultyId,
    #[serde(rename = "difficultyLevel")]
    pub level: String,
    #[serde(rename = "nicheID")]
    pub niche_id: NicheId,
}

/// A leaf of the hierarchy; its id selects a question pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFormat {
    #[serde(rename = "formatID")]
    pub id: FormatId,
    #[serde(rename = "format")]
    pub kind: FormatKind,
    #[serde(rename = "difficultyID")]
    pub difficulty_id: DifficultyId,
}

/// Whole hierarchy in one snapshot, for clients that cache it up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuestionHierarchy {
    pub domains: Vec<Domain>,
    #[serde(rename = "subdomains")]
    pub sub_domains: Vec<SubDomain>,
    pub niches: Vec<Niche>,
    pub difficulty_levels: Vec<DifficultyLevel>,
    pub formats: Vec<QuestionFormat>,
}
