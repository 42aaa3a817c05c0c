use std::sync::Arc;

use flowguard_common::clock::now_ms;
use flowguard_common::rule::RuleEntity;

use super::error::RepositoryError;
use super::source::RuleSource;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T> {
    Updated(T),
    /// The id was not in the list; the unchanged list was republished.
    Missing,
    /// The app has no rules at all; nothing was published.
    Empty,
}

/// Small relational facade over a "fetch whole list / replace whole list"
/// source. Every mutation republishes the complete list for the app.
pub struct RuleRepository<T: RuleEntity> {
    source: Arc<dyn RuleSource<T>>,
}

impl<T: RuleEntity> Clone for RuleRepository<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T: RuleEntity> RuleRepository<T> {
    pub fn new(source: Arc<dyn RuleSource<T>>) -> Self {
        Self { source }
    }

    /// All rules of `app`, normalized and sorted by id.
    pub async fn list(&self, app: &str) -> Result<Vec<T>, RepositoryError> {
        let mut rules = self.source.get_rules(app).await?;
        for rule in &mut rules {
            rule.normalize(app);
        }
        rules.sort_by_key(|r| r.id());
        Ok(rules)
    }

    /// `Ok(None)` only when the store answered and the id is absent.
    pub async fn find_by_id(&self, app: &str, id: i64) -> Result<Option<T>, RepositoryError> {
        match self.list(app).await {
            Ok(rules) => Ok(rules.into_iter().find(|r| r.id() == Some(id))),
            Err(e) => {
                tracing::error!(kind = T::KIND, app, id, error = %e, "failed to look up rule");
                Err(e)
            }
        }
    }

    pub async fn save(&self, mut entity: T) -> Result<T, RepositoryError> {
        if entity.app().trim().is_empty() {
            return Err(RepositoryError::InvalidArgument("app is required".into()));
        }
        if entity.id().is_some() {
            return Err(RepositoryError::InvalidArgument("id must be null".into()));
        }
        let app = entity.app().to_string();
        let mut rules = self.list(&app).await?;

        let next_id = rules
            .iter()
            .filter_map(|r| r.id())
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| RepositoryError::InvalidArgument("rule id space exhausted".into()))?;
        let now = now_ms();
        let meta = entity.meta_mut();
        meta.id = Some(next_id);
        meta.gmt_create.get_or_insert(now);
        meta.gmt_modified.get_or_insert(now);

        rules.push(entity.clone());
        self.source.publish(&app, &rules).await?;
        tracing::info!(kind = T::KIND, app = %app, id = next_id, "rule created");
        Ok(entity)
    }

    pub async fn update(&self, mut entity: T) -> Result<UpdateOutcome<T>, RepositoryError> {
        let Some(id) = entity.id() else {
            return Err(RepositoryError::InvalidArgument("id is required".into()));
        };
        if entity.app().trim().is_empty() {
            return Err(RepositoryError::InvalidArgument("app is required".into()));
        }
        let app = entity.app().to_string();
        let mut rules = self.list(&app).await?;
        if rules.is_empty() {
            return Ok(UpdateOutcome::Empty);
        }

        let outcome = match rules.iter().position(|r| r.id() == Some(id)) {
            Some(i) => {
                entity.merge_immutable(&rules[i], now_ms())?;
                rules[i] = entity.clone();
                UpdateOutcome::Updated(entity)
            }
            None => {
                tracing::warn!(kind = T::KIND, app = %app, id, "update of unknown rule id");
                UpdateOutcome::Missing
            }
        };

        self.source.publish(&app, &rules).await?;
        Ok(outcome)
    }

    /// Removes every rule carrying `id` and returns how many went away.
    pub async fn delete(&self, app: &str, id: i64) -> Result<usize, RepositoryError> {
        let mut rules = self.list(app).await?;
        if rules.is_empty() {
            return Ok(0);
        }

        let before = rules.len();
        rules.retain(|r| r.id() != Some(id));
        let removed = before - rules.len();

        self.source.publish(app, &rules).await?;
        tracing::info!(kind = T::KIND, app, id, removed, "rule deleted");
        Ok(removed)
    }
}
