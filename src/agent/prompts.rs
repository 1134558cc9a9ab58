//! Prompt builders, one per agent.
//!
//! Research prompts work from the subject alone. Analysis prompts consume a
//! digest of the research findings, synthesis prompts consume both digests,
//! and the decision agent reads the finished report. Every prompt that
//! expects structured output spells out the JSON shape it wants.

use crate::state::TaskResult;

/// Render settled task results into a prompt-ready digest. Failed tasks are
/// marked rather than dropped so downstream agents know where the gaps are.
pub fn digest(results: &[TaskResult]) -> String {
    if results.is_empty() {
        return "(no findings available)".to_string();
    }

    let mut sections = Vec::with_capacity(results.len());
    for result in results {
        let body = if result.success {
            match &result.output {
                Some(value) => {
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
                }
                None => result
                    .raw_text
                    .clone()
                    .unwrap_or_else(|| "(empty reply)".to_string()),
            }
        } else {
            format!(
                "[no data: {}]",
                result.error.as_deref().unwrap_or("unknown failure")
            )
        };
        sections.push(format!("### {}\n{}", result.task_id, body));
    }
    sections.join("\n\n")
}

pub fn company_profiler(subject_name: &str, subject_description: &str) -> String {
    format!(
        r#"Research the following company for a due diligence check.

Company: {subject_name}
Description: {subject_description}

Establish the fundamentals: what the company does, when it was founded,
where it is based, how it is funded and how big it has grown. Use web_search
to locate sources and web_fetch to read them; ground every claim.

Format your response as valid JSON:
{{
    "name": "{subject_name}",
    "founded": "year or null",
    "headquarters": "city, country or null",
    "funding": {{
        "total_raised": "amount or null",
        "last_round": "round name or null"
    }},
    "business_model": "one sentence",
    "products": ["main products or services"],
    "scale": "employees, customers or revenue, whatever is public"
}}"#
    )
}

pub fn market_researcher(subject_name: &str, subject_description: &str) -> String {
    format!(
        r#"Research the market that the following company operates in.

Company: {subject_name}
Description: {subject_description}

Size the market, describe its growth trajectory and name the forces shaping
it. Use web_search and web_fetch to find current figures.

Format your response as valid JSON:
{{
    "market": "one-line definition of the market",
    "market_size": "latest figure with year, or null",
    "growth_rate": "CAGR or recent growth, or null",
    "trends": ["notable trends"],
    "tailwinds": ["forces helping companies in this market"],
    "headwinds": ["forces working against them"]
}}"#
    )
}

pub fn competitor_scout(subject_name: &str, subject_description: &str) -> String {
    format!(
        r#"Map the competitive landscape around the following company.

Company: {subject_name}
Description: {subject_description}

Identify direct and indirect competitors and how the company is positioned
against them. Use web_search and web_fetch for evidence.

Format your response as valid JSON:
{{
    "direct_competitors": [
        {{"name": "competitor", "note": "how they overlap"}}
    ],
    "indirect_competitors": ["names"],
    "differentiation": "what sets {subject_name} apart, if anything",
    "competitive_pressure": "low | medium | high"
}}"#
    )
}

pub fn team_investigator(subject_name: &str) -> String {
    format!(
        r#"Investigate the founding team and key people behind {subject_name}.

Look for founders, their prior ventures and roles, notable hires and any
relevant departures. Use web_search and web_fetch; prefer primary sources.

Format your response as valid JSON:
{{
    "founders": [
        {{"name": "person", "role": "title", "background": "one sentence"}}
    ],
    "key_people": ["other notable team members"],
    "track_record": "prior exits, failures or relevant experience",
    "concerns": ["gaps or red flags, if any"]
}}"#
    )
}

pub fn news_monitor(subject_name: &str) -> String {
    format!(
        r#"Collect recent news coverage of {subject_name}.

Find announcements, funding news, product launches, controversies and the
general tone of coverage from the last year. Use web_search and web_fetch.

Format your response as valid JSON:
{{
    "headlines": [
        {{"title": "headline", "date": "when, if known", "summary": "one sentence"}}
    ],
    "sentiment": "positive | neutral | negative | mixed",
    "notable_events": ["events worth flagging"]
}}"#
    )
}

pub fn financial_analyst(subject_name: &str, research_digest: &str) -> String {
    format!(
        r#"You are a financial analyst on a due diligence team reviewing {subject_name}.

Research findings:
{research_digest}

Assess financial health from what the research uncovered: funding history
and runway, revenue signals, capital efficiency and anything that looks off.
Where the research is silent, say so rather than guessing.

Format your response as valid JSON:
{{
    "financial_health": "strong | adequate | weak | unknown",
    "funding_assessment": "one or two sentences",
    "revenue_signals": ["observed signals"],
    "red_flags": ["financial concerns, if any"],
    "confidence": 0.0
}}"#
    )
}

pub fn tech_evaluator(subject_name: &str, research_digest: &str) -> String {
    format!(
        r#"You are a technology due diligence specialist reviewing {subject_name}.

Research findings:
{research_digest}

Evaluate the technology: maturity, differentiation, dependence on third
parties and how defensible the technical position is.

Format your response as valid JSON:
{{
    "tech_maturity": "experimental | emerging | proven | unknown",
    "differentiation": "what is technically distinctive, if anything",
    "dependencies": ["critical third-party dependencies"],
    "defensibility": "low | medium | high",
    "concerns": ["technical risks"]
}}"#
    )
}

pub fn legal_reviewer(subject_name: &str, research_digest: &str) -> String {
    format!(
        r#"You are a legal reviewer on a due diligence team examining {subject_name}.

Research findings:
{research_digest}

Surface legal and regulatory exposure: licensing regimes, pending or past
litigation, data protection obligations and jurisdiction-specific issues.

Format your response as valid JSON:
{{
    "regulatory_regimes": ["regimes that apply"],
    "litigation": ["known disputes, or empty"],
    "compliance_concerns": ["obligations that look underserved"],
    "exposure": "low | medium | high | unknown"
}}"#
    )
}

pub fn risk_assessor(subject_name: &str, research_digest: &str, analysis_digest: &str) -> String {
    format!(
        r#"You are the risk assessor on a due diligence team reviewing {subject_name}.

Research findings:
{research_digest}

Specialist analyses:
{analysis_digest}

Aggregate the picture: weigh the financial, technical and legal reads
against each other and rank the risks that matter most.

Format your response as valid JSON:
{{
    "top_risks": [
        {{"risk": "description", "severity": "low | medium | high", "area": "financial | technical | legal | market | team"}}
    ],
    "overall_risk": "low | medium | high",
    "mitigants": ["factors that soften the risks"]
}}"#
    )
}

pub fn report_generator(
    subject_name: &str,
    research_digest: &str,
    analysis_digest: &str,
) -> String {
    format!(
        r#"You are writing the final due diligence report on {subject_name}.

Research findings:
{research_digest}

Specialist analyses:
{analysis_digest}

Write the full report in markdown with these sections: Executive Summary,
Company Overview, Market, Competition, Team, Financials, Technology, Legal,
Risks, and Open Questions. Be concrete; where the underlying data is missing
or an agent failed, state the gap explicitly instead of papering over it.

Respond with the markdown report only."#
    )
}

pub fn decision_agent(subject_name: &str, report: &str) -> String {
    format!(
        r#"You are the investment committee's decision agent for {subject_name}.

Full due diligence report:
{report}

Weigh the report and make a recommendation. Note the conditions under which
you would change your mind.

Format your response as valid JSON:
{{
    "recommendation": "invest | hold | pass",
    "conviction": "high | medium | low",
    "key_reasons": ["the reasons that carried the decision"],
    "conditions": ["what would change the recommendation"]
}}"#
    )
}

/// Look up the research prompt for a registered agent name. Returns `None`
/// for agents outside the research layer.
pub fn research_prompt(
    agent: &str,
    subject_name: &str,
    subject_description: &str,
) -> Option<String> {
    match agent {
        "company_profiler" => Some(company_profiler(subject_name, subject_description)),
        "market_researcher" => Some(market_researcher(subject_name, subject_description)),
        "competitor_scout" => Some(competitor_scout(subject_name, subject_description)),
        "team_investigator" => Some(team_investigator(subject_name)),
        "news_monitor" => Some(news_monitor(subject_name)),
        _ => None,
    }
}

/// Look up the analysis prompt for a registered agent name. The risk
/// assessor is not covered here: it also needs the analysis digest, which
/// only exists once the rest of the layer has settled.
pub fn analysis_prompt(agent: &str, subject_name: &str, research_digest: &str) -> Option<String> {
    match agent {
        "financial_analyst" => Some(financial_analyst(subject_name, research_digest)),
        "tech_evaluator" => Some(tech_evaluator(subject_name, research_digest)),
        "legal_reviewer" => Some(legal_reviewer(subject_name, research_digest)),
        _ => None,
    }
}
