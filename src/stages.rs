//! The fixed catalog of legal-analysis stages.
//!
//! The workflow walks these twelve stages in order, each call feeding the
//! previous outputs back as context. Stage labels are snapshotted onto the
//! persisted records at creation time, so editing this catalog never rewrites
//! history.

/// One entry in the ordered stage catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDef {
    /// Position in the fixed 0..N-1 sequence.
    pub index: i32,
    /// Display label, snapshotted onto records at creation.
    pub label: &'static str,
    /// One-line description of what the stage covers.
    pub description: &'static str,
    /// The aspects the analysis for this stage should address.
    pub key_points: &'static [&'static str],
}

/// The ordered stage definitions.
pub const STAGES: &[StageDef] = &[
    StageDef {
        index: 0,
        label: "Stage 1: Identifying the legal issue",
        description: "Pin down the central legal problem raised by the case text",
        key_points: &[
            "State the core dispute in legal terms",
            "Separate legal questions from factual ones",
            "Identify the parties and their capacities",
        ],
    },
    StageDef {
        index: 1,
        label: "Stage 2: Gathering information and documents",
        description: "Inventory the facts, documents, and evidence the case rests on",
        key_points: &[
            "List the documents referenced or implied by the text",
            "Flag missing records that would strengthen the file",
            "Order events chronologically",
        ],
    },
    StageDef {
        index: 2,
        label: "Stage 3: Analyzing the legal texts",
        description: "Read the statutory provisions that bear on the issue",
        key_points: &[
            "Quote the controlling provisions",
            "Interpret ambiguous wording",
            "Note interactions between overlapping texts",
        ],
    },
    StageDef {
        index: 3,
        label: "Stage 4: Determining the applicable legal rules",
        description: "Select which rules actually govern these facts",
        key_points: &[
            "Match each fact pattern to a rule",
            "Resolve conflicts of rules",
            "State the conditions each rule requires",
        ],
    },
    StageDef {
        index: 4,
        label: "Stage 5: Analyzing judicial precedents",
        description: "Survey case law interpreting the applicable rules",
        key_points: &[
            "Summarize the leading decisions",
            "Distinguish adverse precedents on their facts",
            "Note the current direction of the courts",
        ],
    },
    StageDef {
        index: 5,
        label: "Stage 6: Analyzing legal doctrine",
        description: "Bring in scholarly commentary on the contested points",
        key_points: &[
            "Present the majority and minority doctrinal views",
            "Relate doctrine to the precedents already surveyed",
        ],
    },
    StageDef {
        index: 6,
        label: "Stage 7: Analyzing the factual circumstances",
        description: "Apply the rules to the concrete circumstances of this case",
        key_points: &[
            "Weigh the evidence for each disputed fact",
            "Assess credibility and burden of proof",
            "Identify facts that change the legal outcome",
        ],
    },
    StageDef {
        index: 7,
        label: "Stage 8: Identifying possible legal solutions",
        description: "Enumerate the courses of action open to the client",
        key_points: &[
            "List judicial and extra-judicial options",
            "Note procedural prerequisites and deadlines for each",
        ],
    },
    StageDef {
        index: 8,
        label: "Stage 9: Evaluating the legal solutions",
        description: "Weigh each candidate solution's strengths and risks",
        key_points: &[
            "Estimate prospects of success",
            "Compare cost, duration, and enforcement risk",
        ],
    },
    StageDef {
        index: 9,
        label: "Stage 10: Selecting the optimal solution",
        description: "Choose the best-supported course of action",
        key_points: &[
            "Justify the choice against the evaluation criteria",
            "State the fallback if the primary route fails",
        ],
    },
    StageDef {
        index: 10,
        label: "Stage 11: Drafting the legal solution",
        description: "Draft the chosen solution in operative legal language",
        key_points: &[
            "Structure the argument claim by claim",
            "Cite the texts and precedents relied on",
        ],
    },
    StageDef {
        index: 11,
        label: "Stage 12: Presenting recommendations",
        description: "Close with practical recommendations and next steps",
        key_points: &[
            "Summarize the conclusions of all stages",
            "List concrete actions with owners and deadlines",
        ],
    },
];

/// Number of ordinary stages.
pub const STAGE_COUNT: usize = STAGES.len();

/// Reserved sentinel index for the final-petition synthesis record, one past
/// the ordinary 0..N-1 range.
pub const FINAL_STAGE_INDEX: i32 = STAGE_COUNT as i32;

/// Label snapshotted onto final-petition records.
pub const FINAL_STAGE_LABEL: &str = "Final petition";

/// Look up a stage definition by index.
pub fn stage_by_index(index: i32) -> Option<&'static StageDef> {
    usize::try_from(index).ok().and_then(|i| STAGES.get(i))
}
