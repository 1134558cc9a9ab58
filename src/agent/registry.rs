//! The built-in agent catalog.
//!
//! Eleven agents across three layers. Declaration order matters: stage
//! results come back in the order agents are declared here, and tests
//! depend on that.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DossierError, Result};
use crate::tools;

/// Pipeline layer an agent belongs to. Layers run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLayer {
    Research,
    Analysis,
    Synthesis,
}

impl AgentLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentLayer::Research => "research",
            AgentLayer::Analysis => "analysis",
            AgentLayer::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for AgentLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one agent.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub name: &'static str,
    pub layer: AgentLayer,
    /// Model alias; resolved against the configured model at run time.
    pub model: &'static str,
    pub tools: &'static [&'static str],
    pub description: &'static str,
}

const WEB_TOOLS: &[&str] = &[tools::WEB_SEARCH, tools::WEB_FETCH];

/// Lookup and iteration over the agent catalog.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentSpec>,
}

impl AgentRegistry {
    /// The full built-in catalog, in execution order.
    pub fn builtin() -> Self {
        Self {
            agents: vec![
                AgentSpec {
                    name: "company_profiler",
                    layer: AgentLayer::Research,
                    model: "haiku",
                    tools: WEB_TOOLS,
                    description: "Company fundamentals: founding, funding, product, scale",
                },
                AgentSpec {
                    name: "market_researcher",
                    layer: AgentLayer::Research,
                    model: "haiku",
                    tools: WEB_TOOLS,
                    description: "Market size, growth and dynamics of the subject's sector",
                },
                AgentSpec {
                    name: "competitor_scout",
                    layer: AgentLayer::Research,
                    model: "haiku",
                    tools: WEB_TOOLS,
                    description: "Competitive landscape and the subject's positioning",
                },
                AgentSpec {
                    name: "team_investigator",
                    layer: AgentLayer::Research,
                    model: "haiku",
                    tools: WEB_TOOLS,
                    description: "Founders and key team backgrounds",
                },
                AgentSpec {
                    name: "news_monitor",
                    layer: AgentLayer::Research,
                    model: "haiku",
                    tools: WEB_TOOLS,
                    description: "Recent news, announcements and sentiment",
                },
                AgentSpec {
                    name: "financial_analyst",
                    layer: AgentLayer::Analysis,
                    model: "sonnet",
                    tools: &[],
                    description: "Financial health read from the research findings",
                },
                AgentSpec {
                    name: "tech_evaluator",
                    layer: AgentLayer::Analysis,
                    model: "sonnet",
                    tools: &[],
                    description: "Technology maturity and defensibility",
                },
                AgentSpec {
                    name: "legal_reviewer",
                    layer: AgentLayer::Analysis,
                    model: "sonnet",
                    tools: &[],
                    description: "Legal and regulatory exposure",
                },
                AgentSpec {
                    name: "risk_assessor",
                    layer: AgentLayer::Analysis,
                    model: "sonnet",
                    tools: &[],
                    description: "Aggregated risk picture across the other analyses",
                },
                AgentSpec {
                    name: "report_generator",
                    layer: AgentLayer::Synthesis,
                    model: "sonnet",
                    tools: &[],
                    description: "Full due diligence report in markdown",
                },
                AgentSpec {
                    name: "decision_agent",
                    layer: AgentLayer::Synthesis,
                    model: "sonnet",
                    tools: &[],
                    description: "Investment recommendation drawn from the report",
                },
            ],
        }
    }

    #[cfg(test)]
    fn from_specs(agents: Vec<AgentSpec>) -> Self {
        Self { agents }
    }

    pub fn get(&self, name: &str) -> Result<&AgentSpec> {
        self.agents
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| DossierError::UnknownAgent {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Agents of one layer, in declaration order.
    pub fn layer(&self, layer: AgentLayer) -> impl Iterator<Item = &AgentSpec> {
        self.agents.iter().filter(move |a| a.layer == layer)
    }

    pub fn agents(&self) -> &[AgentSpec] {
        &self.agents
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.agents.iter().map(|a| a.name).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Catch catalog mistakes at startup: duplicate names and tool ids
    /// nothing can dispatch.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.name) {
                return Err(DossierError::DuplicateAgent {
                    name: agent.name.to_string(),
                });
            }
            tools::validate(agent.tools)?;
        }
        Ok(())
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_eleven_agents() {
        let registry = AgentRegistry::builtin();
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.layer(AgentLayer::Research).count(), 5);
        assert_eq!(registry.layer(AgentLayer::Analysis).count(), 4);
        assert_eq!(registry.layer(AgentLayer::Synthesis).count(), 2);
    }

    #[test]
    fn builtin_catalog_validates() {
        assert!(AgentRegistry::builtin().validate().is_ok());
    }

    #[test]
    fn research_layer_preserves_declaration_order() {
        let registry = AgentRegistry::builtin();
        let names: Vec<_> = registry
            .layer(AgentLayer::Research)
            .map(|a| a.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "company_profiler",
                "market_researcher",
                "competitor_scout",
                "team_investigator",
                "news_monitor"
            ]
        );
    }

    #[test]
    fn research_agents_carry_web_tools() {
        let registry = AgentRegistry::builtin();
        for agent in registry.layer(AgentLayer::Research) {
            assert_eq!(agent.tools, WEB_TOOLS, "{}", agent.name);
        }
        for agent in registry.layer(AgentLayer::Analysis) {
            assert!(agent.tools.is_empty(), "{}", agent.name);
        }
    }

    #[test]
    fn get_unknown_agent_reports_available_names() {
        let registry = AgentRegistry::builtin();
        let err = registry.get("ghost_agent").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[DOSS-001]"), "{message}");
        assert!(message.contains("ghost_agent"));
        assert!(message.contains("company_profiler"));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let spec = AgentSpec {
            name: "twin",
            layer: AgentLayer::Research,
            model: "haiku",
            tools: &[],
            description: "",
        };
        let registry = AgentRegistry::from_specs(vec![spec, spec]);
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("[DOSS-002]"), "{err}");
    }

    #[test]
    fn validate_rejects_unknown_tool_ids() {
        let registry = AgentRegistry::from_specs(vec![AgentSpec {
            name: "seer",
            layer: AgentLayer::Research,
            model: "haiku",
            tools: &["telepathy"],
            description: "",
        }]);
        assert!(registry.validate().is_err());
    }

    #[test]
    fn layer_round_trips_through_serde_as_snake_case() {
        let json = serde_json::to_string(&AgentLayer::Research).unwrap();
        assert_eq!(json, "\"research\"");
        let back: AgentLayer = serde_json::from_str("\"synthesis\"").unwrap();
        assert_eq!(back, AgentLayer::Synthesis);
    }
}
