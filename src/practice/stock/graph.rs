//! Stock analysis graph wiring
//!
//! ```text
//! START -> supervisor --next--> Researcher | Stock_Analyzer | Chart_Generator -> supervisor
//!                     --FINISH--> END
//! ```

use super::routing::TeamRouter;
use super::state::{self, CHART_GENERATOR, FINISH, MEMBERS, NEXT, RESEARCHER, STOCK_ANALYZER};
use super::steps::{SupervisorStep, WorkerStep};
use crate::adk::error::Result;
use crate::practice::config::{Services, Settings};
use crate::practice::workflow::graph::{CompiledGraph, StateGraph, WaitMode, END, START};

pub const SUPERVISOR: &str = "supervisor";

/// Registry tools each member may call
pub fn member_tools(member: &str) -> &'static [&'static str] {
    match member {
        RESEARCHER => &["tavily_search"],
        STOCK_ANALYZER => &["analyze_stock_ticker"],
        CHART_GENERATOR => &["create_stock_chart"],
        _ => &[],
    }
}

pub async fn build_stock_graph(services: &Services, settings: &Settings) -> Result<CompiledGraph> {
    let router = TeamRouter::new(
        MEMBERS.iter().map(|m| m.to_string()).collect(),
        settings.stock.max_trials,
    );

    let mut graph = StateGraph::new("stock_analysis", state::schema());
    graph.add_node_with(
        SUPERVISOR,
        SupervisorStep {
            model: services.model.clone(),
            router,
        },
        WaitMode::Any,
    );

    for member in MEMBERS {
        let tools = services.registry.resolve(member_tools(member)).await?;
        graph
            .add_node(
                member,
                WorkerStep {
                    name: member.to_string(),
                    model: services.model.clone(),
                    tools,
                    max_turns: settings.agent.max_turns,
                },
            )
            .add_edge(member, SUPERVISOR);
    }

    let mut routes: Vec<(&str, &str)> = MEMBERS.iter().map(|m| (*m, *m)).collect();
    routes.push((FINISH, END));

    graph
        .add_edge(START, SUPERVISOR)
        .add_conditional_edges(SUPERVISOR, NEXT, routes)
        .with_recursion_limit(settings.executor.recursion_limit);

    graph.compile()
}
