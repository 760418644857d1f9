//! Tier A / Tier B 提示词
//!
//! Tier A 要求模型输出整份计划（schemars 生成的 JSON Schema 注入 instructions），
//! Tier B 只要求单个动作的扁平 JSON。两者都附带动作目录、可用项目与会话上下文。

use schemars::schema_for;

use crate::intent::catalog::render_catalog;
use crate::intent::parser::PlanDocument;

/// Tier A 计划文档的 JSON Schema（拼入 instructions）
pub fn plan_schema_json() -> String {
    let schema = schema_for!(PlanDocument);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

pub fn plan_instructions() -> String {
    format!(
        "You translate requests about test automation into an execution plan.\n\
         Reply with ONE JSON object and nothing else. It must match this JSON Schema:\n\
         {schema}\n\n\
         Rules:\n\
         - Use only the action tags listed in AVAILABLE ACTIONS.\n\
         - Number steps 1, 2, 3 ... in order. depends_on may only reference an earlier step.\n\
         - Use a project from AVAILABLE PROJECTS. If the request does not name one, use the active \
           project from SESSION STATE when there is one.\n\
         - If you cannot tell which project or action is meant, set needs_clarification to true and \
           ask one short question in clarification_question, with an empty actions list.\n\
         - If the request has nothing to do with these actions, set understood to false.\n\n\
         AVAILABLE ACTIONS:\n{catalog}",
        schema = plan_schema_json(),
        catalog = render_catalog(),
    )
}

pub fn intent_instructions() -> String {
    format!(
        "You classify a request about test automation into ONE action.\n\
         Reply with ONE flat JSON object and nothing else, for example:\n\
         {{\"action\": \"run_tests\", \"project\": \"acme\", \"mode\": \"auto\", \"confidence\": 0.9}}\n\
         Put parameters at the top level next to \"action\". Omit parameters you do not know.\n\
         Use \"action\": \"unknown\" when nothing fits.\n\n\
         AVAILABLE ACTIONS:\n{catalog}",
        catalog = render_catalog(),
    )
}

/// 用户侧 prompt：项目列表 + 会话上下文 + 原始请求
pub fn build_prompt(input: &str, context: &str, projects: &[String]) -> String {
    let projects = if projects.is_empty() {
        "(none configured)".to_string()
    } else {
        projects.join(", ")
    };
    format!("AVAILABLE PROJECTS: {projects}\n\n{context}\n\nREQUEST: {input}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_schema_names_fields() {
        let schema = plan_schema_json();
        assert!(schema.contains("needs_clarification"));
        assert!(schema.contains("depends_on"));
    }

    #[test]
    fn test_build_prompt_lists_projects() {
        let prompt = build_prompt("run tests", "No previous context.", &["acme".into(), "beta".into()]);
        assert!(prompt.contains("AVAILABLE PROJECTS: acme, beta"));
        assert!(prompt.ends_with("REQUEST: run tests"));
        let empty = build_prompt("x", "", &[]);
        assert!(empty.contains("(none configured)"));
    }
}
