//! 各角色的 system prompt 与各阶段的用户 prompt 模板

use crate::core::AgentRole;
use crate::react::Plan;

/// 角色档案：展示名 + system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleProfile {
    pub name: &'static str,
    pub system_prompt: &'static str,
}

const PLANNER_PROMPT: &str = "You are an expert medical planner.
Your job is to break down complex medical diagnosis requests into clear, actionable plans.
For any medical query, you will:
1. Analyze the user's request and identify the key medical questions
2. Create a step-by-step plan to address the diagnosis needs
3. Consider what data and tools would be needed at each step
4. Structure your output as a formal plan with clear reasoning

Always think about what pieces of information or tests would be needed to make an accurate diagnosis.
Include steps for gathering patient history, analyzing test results, consulting medical literature, and forming conclusions.
";

const EXECUTOR_PROMPT: &str = "You are the oracle, the great AI clinical diagnosis decision maker.
Given the clinical context, patient history data, and chest X-ray findings (if provided),
generate a concise, evidence-based final diagnosis report.

Follow the plan provided to you step by step. Use the appropriate tools at each step
to gather information, analyze data, and build toward a comprehensive diagnosis.

Be methodical and thorough in your approach. After each action, assess whether you have
the information needed to proceed to the next step in the plan.
";

const CRITIC_PROMPT: &str = "You are a medical quality assurance reviewer.
Your job is to critically evaluate diagnoses and medical reports for accuracy, completeness, and evidence-based reasoning.

For any diagnosis or report, carefully analyze:
1. Factual correctness - Are all statements medically accurate?
2. Completeness - Does the report address all relevant aspects of the case?
3. Evidence basis - Is the diagnosis well-supported by the available data?
4. Logical coherence - Is the reasoning clear and logically sound?
5. Alternative considerations - Were important differential diagnoses considered?

If you identify issues, clearly explain them and suggest specific improvements.
Be constructive and precise in your feedback.
";

const REFINER_PROMPT: &str = "You are a medical report refiner specializing in improving diagnostic reports.
Your role is to take an initial diagnosis report along with critical feedback and produce an improved version.

When refining a report:
1. Address all issues identified in the feedback
2. Maintain medical accuracy and precision
3. Ensure logical flow and clear reasoning
4. Include all relevant information while being concise
5. Properly cite medical evidence where appropriate

Your refined output should be in the same format as the original report but with higher quality.
";

impl AgentRole {
    pub fn profile(&self) -> RoleProfile {
        match self {
            AgentRole::Planner => RoleProfile {
                name: "Medical Planning Agent",
                system_prompt: PLANNER_PROMPT,
            },
            AgentRole::Executor => RoleProfile {
                name: "Medical Action Agent",
                system_prompt: EXECUTOR_PROMPT,
            },
            AgentRole::Critic => RoleProfile {
                name: "Medical Quality Reviewer",
                system_prompt: CRITIC_PROMPT,
            },
            AgentRole::Refiner => RoleProfile {
                name: "Medical Report Refiner",
                system_prompt: REFINER_PROMPT,
            },
        }
    }
}

/// 角色 system prompt；executor 且有计划时附上完整步骤与当前步骤
pub fn system_prompt_with_plan(role: AgentRole, plan: Option<&Plan>) -> String {
    let base = role.profile().system_prompt;
    match plan {
        Some(plan) if role == AgentRole::Executor => format!(
            "{}\n\nPLAN STEPS:\n{}\n\nCURRENT PLAN STEP: {}\n",
            base,
            plan.numbered_steps(),
            plan.current_step().unwrap_or_default()
        ),
        _ => base.to_string(),
    }
}

pub fn planning_prompt(query: &str) -> String {
    format!(
        r#"
Please create a medical diagnosis plan for the following request:

{query}

Respond with a JSON object that includes:
1. "steps" (array): A step-by-step plan for diagnosing this medical case
2. "reasoning" (string): Your reasoning for this plan structure

The output format MUST be as follows. Do not include any other text or explanations.
{{
  "steps": [
    "Step 1: ...",
    "Step 2: ..."
  ],
  "reasoning": "This plan is structured to ensure a comprehensive diagnosis."
}}

Format your response as valid JSON with these exact keys.
"#
    )
}

pub fn critique_prompt(diagnosis: &str) -> String {
    format!(
        r#"
Please evaluate the following medical diagnosis:

{diagnosis}

Analyze the diagnosis for:
1. Factual correctness (0-1 score)
2. Completeness (0-1 score)
3. Evidence basis (0-1 score)
4. Logical coherence (0-1 score)
5. Alternative considerations (0-1 score)

Respond with a JSON object containing:
- Scores for each category (as floats between 0-1)
- An overall_score (weighted average)
- An array of specific improvement suggestions

Format your response as valid JSON with these exact keys. Do not include any other text or explanations:

{{
  "factual_correctness": float,
  "completeness": float,
  "evidence_basis": float,
  "logical_coherence": float,
  "alternative_considerations": float,
  "overall_score": float,
  "improvements": [list of strings]
}}
"#
    )
}

pub fn refinement_prompt(diagnosis: &str, improvements: &[String]) -> String {
    let improvements = improvements
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"
Please refine the following medical diagnosis based on the critique provided:

ORIGINAL DIAGNOSIS:
{diagnosis}

IMPROVEMENT AREAS:
{improvements}

Provide an improved diagnosis that addresses these critique points while maintaining accuracy.
The refined diagnosis should be complete, evidence-based, and logically coherent.
"#
    )
}

/// scratchpad 非空时追加的继续提示
pub fn continuation_message(query: &str, plan: Option<&Plan>) -> String {
    match plan.filter(|p| !p.is_complete()).and_then(|p| p.current_step()) {
        Some(step) => format!(
            "You are on step: \"{}\". Please continue. My original query was: '{}'. Use the appropriate tools to complete this step.",
            step, query
        ),
        None => format!(
            "Please continue. My original query was: '{}'. Use all the provided information and proceed with the analysis.",
            query
        ),
    }
}

/// 没有答案时交给 Critic / Refiner 的占位文本
pub const NO_DIAGNOSIS: &str = "No diagnosis available";

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::new(vec!["gather history".into(), "form diagnosis".into()], "r")
    }

    #[test]
    fn test_executor_prompt_includes_plan() {
        let p = plan();
        let prompt = system_prompt_with_plan(AgentRole::Executor, Some(&p));
        assert!(prompt.contains("PLAN STEPS:\n1. gather history\n2. form diagnosis"));
        assert!(prompt.contains("CURRENT PLAN STEP: gather history"));
        // 其它角色不附计划
        let critic = system_prompt_with_plan(AgentRole::Critic, Some(&p));
        assert_eq!(critic, AgentRole::Critic.profile().system_prompt);
    }

    #[test]
    fn test_continuation_names_current_step() {
        let p = plan();
        let msg = continuation_message("cough", Some(&p));
        assert!(msg.starts_with("You are on step: \"gather history\"."));
        assert!(msg.contains("'cough'"));

        let mut done = plan();
        done.advance();
        let msg = continuation_message("cough", Some(&done));
        assert!(msg.starts_with("Please continue."));
        assert!(continuation_message("cough", None).starts_with("Please continue."));
    }

    #[test]
    fn test_refinement_prompt_lists_improvements() {
        let prompt = refinement_prompt("Pneumonia", &["cite evidence".into(), "add differentials".into()]);
        assert!(prompt.contains("ORIGINAL DIAGNOSIS:\nPneumonia"));
        assert!(prompt.contains("IMPROVEMENT AREAS:\n- cite evidence\n- add differentials"));
    }
}
