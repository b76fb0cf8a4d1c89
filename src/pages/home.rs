use leptos::prelude::*;
use log::error;

use crate::components::family_tree::FamilyTreeCanvas;
use crate::engine::FamilyGraph;

const SAMPLE_FAMILY: &str = include_str!("../../assets/sample_family.json");

/// Three generations of Strands and Bergs, plus an unrelated Dahl line.
fn sample_family() -> FamilyGraph {
	FamilyGraph::from_json(SAMPLE_FAMILY).unwrap_or_else(|err| {
		error!("sample family is not valid JSON: {err}");
		FamilyGraph::default()
	})
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let graph_data = Signal::derive(sample_family);

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<FamilyTreeCanvas data=graph_data fullscreen=true />
				<div class="graph-overlay">
					<h1>"Family Tree"</h1>
					<p class="subtitle">"Click a person for details. Scroll to zoom. Drag to pan."</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
