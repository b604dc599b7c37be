//! Role Definitions and Model Inheritance
//!
//! The generation pipeline is a fixed ordered set of seven roles, each
//! refining the draft left by the previous one. A role is configured with
//! either an explicit model identifier or an `inherit` marker tracking an
//! upstream role. Inheritance is resolved whenever configuration is read —
//! never lazily at invocation time — so a change to an upstream model
//! propagates exactly to the roles still marked as inheriting.

use std::collections::{BTreeSet, HashMap};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One of the seven fixed pipeline stages, in invocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    ContextScout,
    Planner,
    Coder,
    Reviewer,
    Qa,
    Safety,
    Verifier,
}

impl Role {
    /// Invocation order of a turn. Each role only ever sees the output of
    /// the role before it.
    pub const ORDER: [Role; 7] = [
        Role::ContextScout,
        Role::Planner,
        Role::Coder,
        Role::Reviewer,
        Role::Qa,
        Role::Safety,
        Role::Verifier,
    ];

    /// The upstream role this one tracks when its model is set to inherit.
    ///
    /// The planner is the root of the inheritance graph; the scout tracks
    /// the planner, and the remaining roles form the chain
    /// planner → reviewer → coder → qa → safety → verifier.
    pub fn inherits_from(self) -> Option<Role> {
        match self {
            Role::Planner => None,
            Role::ContextScout => Some(Role::Planner),
            Role::Reviewer => Some(Role::Planner),
            Role::Coder => Some(Role::Reviewer),
            Role::Qa => Some(Role::Coder),
            Role::Safety => Some(Role::Qa),
            Role::Verifier => Some(Role::Safety),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::ContextScout => "contextScout",
            Role::Planner => "planner",
            Role::Coder => "coder",
            Role::Reviewer => "reviewer",
            Role::Qa => "qa",
            Role::Safety => "safety",
            Role::Verifier => "verifier",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling parameters for one role, each overriding the global default
/// when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sampling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
}

impl Sampling {
    /// Field-wise override: values set on `self` win over `fallback`.
    pub fn or(self, fallback: Sampling) -> Sampling {
        Sampling {
            temperature: self.temperature.or(fallback.temperature),
            top_p: self.top_p.or(fallback.top_p),
            repeat_penalty: self.repeat_penalty.or(fallback.repeat_penalty),
        }
    }
}

/// A role's configured model: an explicit identifier, or the `inherit`
/// marker tracking the role's upstream neighbour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelChoice {
    #[default]
    Inherit,
    Pinned(String),
}

impl ModelChoice {
    pub fn pinned(model: impl Into<String>) -> Self {
        ModelChoice::Pinned(model.into())
    }
}

impl Serialize for ModelChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModelChoice::Inherit => serializer.serialize_str("inherit"),
            ModelChoice::Pinned(id) => serializer.serialize_str(id),
        }
    }
}

impl<'de> Deserialize<'de> for ModelChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(D::Error::custom("model identifier must not be blank"));
        }
        if trimmed.eq_ignore_ascii_case("inherit") {
            Ok(ModelChoice::Inherit)
        } else {
            Ok(ModelChoice::Pinned(trimmed.to_string()))
        }
    }
}

/// Per-role configuration entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleSettings {
    pub model: ModelChoice,
    #[serde(flatten)]
    pub sampling: Sampling,
}

impl RoleSettings {
    pub fn pinned(model: impl Into<String>) -> Self {
        Self {
            model: ModelChoice::pinned(model),
            sampling: Sampling::default(),
        }
    }
}

/// Configuration for all seven roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RolesConfig {
    pub context_scout: RoleSettings,
    pub planner: RoleSettings,
    pub coder: RoleSettings,
    pub reviewer: RoleSettings,
    pub qa: RoleSettings,
    pub safety: RoleSettings,
    pub verifier: RoleSettings,
}

impl RolesConfig {
    pub fn get(&self, role: Role) -> &RoleSettings {
        match role {
            Role::ContextScout => &self.context_scout,
            Role::Planner => &self.planner,
            Role::Coder => &self.coder,
            Role::Reviewer => &self.reviewer,
            Role::Qa => &self.qa,
            Role::Safety => &self.safety,
            Role::Verifier => &self.verifier,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut RoleSettings {
        match role {
            Role::ContextScout => &mut self.context_scout,
            Role::Planner => &mut self.planner,
            Role::Coder => &mut self.coder,
            Role::Reviewer => &mut self.reviewer,
            Role::Qa => &mut self.qa,
            Role::Safety => &mut self.safety,
            Role::Verifier => &mut self.verifier,
        }
    }

    /// Resolve every role to a concrete model and sampling set.
    ///
    /// Walks the inheritance graph top-down (planner first), so each role's
    /// upstream is already concrete when the role itself is visited. A role
    /// with no pinned model and no resolvable upstream falls back to the
    /// global default model. Call this again after any settings change; the
    /// result is a snapshot, not a live view.
    pub fn resolve(&self, default_model: &str, defaults: Sampling) -> ResolvedRoles {
        // Planner before its dependents; the remaining order follows the
        // inheritance edges, not the invocation order.
        const RESOLUTION_ORDER: [Role; 7] = [
            Role::Planner,
            Role::ContextScout,
            Role::Reviewer,
            Role::Coder,
            Role::Qa,
            Role::Safety,
            Role::Verifier,
        ];

        let mut roles = HashMap::new();
        for role in RESOLUTION_ORDER {
            let settings = self.get(role);
            let model = match &settings.model {
                ModelChoice::Pinned(id) => id.clone(),
                ModelChoice::Inherit => role
                    .inherits_from()
                    .and_then(|upstream| roles.get(&upstream))
                    .map(|resolved: &ResolvedRole| resolved.model.clone())
                    .unwrap_or_else(|| default_model.to_string()),
            };
            roles.insert(
                role,
                ResolvedRole {
                    model,
                    sampling: settings.sampling.or(defaults),
                },
            );
        }
        ResolvedRoles { roles }
    }
}

/// A role's concrete configuration after inheritance resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRole {
    pub model: String,
    pub sampling: Sampling,
}

/// Snapshot of all roles' concrete models and sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoles {
    roles: HashMap<Role, ResolvedRole>,
}

impl ResolvedRoles {
    pub fn get(&self, role: Role) -> &ResolvedRole {
        // The map is total by construction: resolve() visits every variant.
        &self.roles[&role]
    }

    /// The distinct model identifiers across all roles — the set of
    /// physical model handles a turn needs.
    pub fn distinct_models(&self) -> BTreeSet<String> {
        self.roles.values().map(|r| r.model.clone()).collect()
    }
}
