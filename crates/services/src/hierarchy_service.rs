use std::sync::Arc;

use portal_core::model::{
    DifficultyId, DifficultyLevel, Domain, DomainId, Niche, NicheId, QuestionFormat,
    QuestionHierarchy, SubDomain, SubDomainId,
};
use storage::repository::HierarchyRepository;

use crate::error::HierarchyError;

fn non_empty<T>(items: Vec<T>, what: &'static str) -> Result<Vec<T>, HierarchyError> {
    if items.is_empty() {
        Err(HierarchyError::Empty { what })
    } else {
        Ok(items)
    }
}

/// Read-only browsing of domain > sub-domain > niche > difficulty > format.
///
/// Child listings that come back empty are reported as `HierarchyError::Empty`.
#[derive(Clone)]
pub struct HierarchyService {
    hierarchy: Arc<dyn HierarchyRepository>,
}

impl HierarchyService {
    #[must_use]
    pub fn new(hierarchy: Arc<dyn HierarchyRepository>) -> Self {
        Self { hierarchy }
    }

    /// # Errors
    ///
    /// Returns `HierarchyError` on storage failure or when nothing exists.
    pub async fn domains(&self) -> Result<Vec<Domain>, HierarchyError> {
        non_empty(self.hierarchy.list_domains().await?, "domains")
    }

    /// # Errors
    ///
    /// Returns `HierarchyError` on storage failure or when the domain has none.
    pub async fn sub_domains(&self, domain_id: DomainId) -> Result<Vec<SubDomain>, HierarchyError> {
        non_empty(
            self.hierarchy.list_sub_domains(domain_id).await?,
            "sub-domains",
        )
    }

    /// # Errors
    ///
    /// Returns `HierarchyError` on storage failure or when the sub-domain has none.
    pub async fn niches(&self, sub_domain_id: SubDomainId) -> Result<Vec<Niche>, HierarchyError> {
        non_empty(self.hierarchy.list_niches(sub_domain_id).await?, "niches")
    }

    /// # Errors
    ///
    /// Returns `HierarchyError` on storage failure or when the niche has none.
    pub async fn difficulty_levels(
        &self,
        niche_id: NicheId,
    ) -> Result<Vec<DifficultyLevel>, HierarchyError> {
        non_empty(
            self.hierarchy.list_difficulty_levels(niche_id).await?,
            "difficulty levels",
        )
    }

    /// # Errors
    ///
    /// Returns `HierarchyError` on storage failure or when the level has none.
    pub async fn formats(
        &self,
        difficulty_id: DifficultyId,
    ) -> Result<Vec<QuestionFormat>, HierarchyError> {
        non_empty(
            self.hierarchy.list_formats(difficulty_id).await?,
            "formats",
        )
    }

    /// Whole hierarchy in one snapshot; an empty store yields empty lists.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyError::Storage` on storage failure.
    pub async fn snapshot(&self) -> Result<QuestionHierarchy, HierarchyError> {
        Ok(self.hierarchy.hierarchy().await?)
    }
}
