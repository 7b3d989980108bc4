//! Agent card published at `/.well-known/agent.json`.

use super::types::{AgentCapabilities, AgentCard, AgentSkill};
use crate::config::{AgentRole, Config};
use crate::pipeline::Skill;

pub const PROTOCOL_VERSION: &str = "0.3.0";

pub fn agent_card(config: &Config) -> AgentCard {
    let (name, description) = match config.role {
        AgentRole::Pipeline => (
            "A2A Essay Pipeline",
            "Pipeline for writing and editing essays using a large language model",
        ),
        AgentRole::EssayWriter => (
            "Essay Writer Agent",
            "Writes essays and delegates style editing to a style editor agent",
        ),
        AgentRole::StyleEditor => (
            "Style Editor Agent",
            "Improves the clarity and style of text",
        ),
    };

    AgentCard {
        name: name.to_string(),
        description: description.to_string(),
        url: config.public_url.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: AgentCapabilities {
            streaming: true,
            push_notifications: false,
        },
        skills: config.role.skills().into_iter().map(skill_card).collect(),
        default_input_modes: vec!["text/plain".to_string()],
        default_output_modes: vec!["text/plain".to_string()],
    }
}

fn skill_card(skill: Skill) -> AgentSkill {
    let examples = match skill {
        Skill::WriteEssay => vec!["The history of quantum computers".to_string()],
        Skill::EditStyle => vec!["This is bad text.".to_string()],
    };
    AgentSkill {
        id: skill.id().to_string(),
        name: skill.display_name().to_string(),
        description: skill.description().to_string(),
        tags: skill.tags().iter().map(|t| t.to_string()).collect(),
        examples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;

    fn config(role: &str) -> Config {
        Config::from_sources(FileConfig::default(), |name| match name {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "AGENT_ROLE" => Some(role.to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_pipeline_card_lists_both_skills() {
        let card = agent_card(&config("pipeline"));
        assert_eq!(card.name, "A2A Essay Pipeline");
        assert_eq!(card.url, "http://localhost:8000");
        assert!(card.capabilities.streaming);

        let names: Vec<&str> = card.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Write Essay", "Edit Style"]);
    }

    #[test]
    fn test_split_cards_have_one_skill() {
        let writer = agent_card(&config("essay-writer"));
        assert_eq!(writer.skills.len(), 1);
        assert_eq!(writer.skills[0].id, "write_essay");

        let editor = agent_card(&config("style-editor"));
        assert_eq!(editor.skills[0].id, "edit_style");
        assert_eq!(editor.url, "http://localhost:8002");
    }

    #[test]
    fn test_card_wire_names() {
        let value = serde_json::to_value(agent_card(&config("pipeline"))).unwrap();
        assert_eq!(value["defaultInputModes"][0], "text/plain");
        assert_eq!(value["protocolVersion"], PROTOCOL_VERSION);
    }
}
