use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{CanvasStatus, TreeCanvasState, ViewCommand};
use crate::engine::FamilyGraph;

type SharedState = Rc<RefCell<Option<TreeCanvasState>>>;

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Pointer position relative to the canvas' top-left corner.
fn local_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

#[component]
pub fn FamilyTreeCanvas(
	#[prop(into)] data: Signal<FamilyGraph>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (status, set_status) = signal(CanvasStatus::default());
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::error!("canvas has no 2d context");
			return;
		};
		let initial = TreeCanvasState::new(data.get_untracked(), w, h);
		set_status.set(initial.status());
		*state_init.borrow_mut() = Some(initial);

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				render::render(s, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// Relayout whenever the incoming graph changes
	let state_data = state.clone();
	Effect::new(move |_| {
		let graph = data.get();
		if let Some(ref mut s) = *state_data.borrow_mut() {
			s.load(graph);
			set_status.set(s.status());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.begin_pan(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.pan.active {
				s.drag_to(x, y);
			} else {
				let hovered = s.node_at_position(x, y);
				s.set_hover(hovered);
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let position = local_position(canvas_ref, &ev);
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			if let (true, Some((x, y))) = (s.end_pan(), position) {
				s.click(x, y);
			}
			set_status.set(s.status());
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.end_pan();
			s.set_hover(None);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.wheel(ev.delta_y(), x, y);
			set_status.set(s.status());
		}
	};

	let state_cmd = state.clone();
	let on_command = move |command: ViewCommand| {
		if let Some(ref mut s) = *state_cmd.borrow_mut() {
			s.apply(command);
			set_status.set(s.status());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="family-tree-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
		<ViewControls status=status on_command=on_command />
		<PersonCard status=status />
	}
}

/// Zoom, fit, reset and photo toggle buttons.
#[component]
pub fn ViewControls<F>(status: ReadSignal<CanvasStatus>, on_command: F) -> impl IntoView
where
	F: Fn(ViewCommand) + Clone + 'static,
{
	let button = move |label: &'static str, title: &'static str, command: ViewCommand| {
		let on_command = on_command.clone();
		view! {
			<button title=title on:click=move |_| on_command(command)>
				{label}
			</button>
		}
	};

	view! {
		<div class="tree-controls">
			{button("+", "Zoom in", ViewCommand::ZoomIn)}
			<span class="zoom-level">{move || format!("{}%", status.get().zoom_percent)}</span>
			{button("−", "Zoom out", ViewCommand::ZoomOut)}
			{button("⤢", "Fit to screen", ViewCommand::Fit)}
			{button("⟲", "Reset view", ViewCommand::Reset)}
			{button("◐", "Toggle photos", ViewCommand::TogglePhotos)}
		</div>
	}
}

/// Details of the selected person, or the last load error.
#[component]
pub fn PersonCard(status: ReadSignal<CanvasStatus>) -> impl IntoView {
	view! {
		{move || {
			let status = status.get();
			status.error.map(|e| view! { <div class="tree-error">{e}</div> })
		}}
		{move || {
			let status = status.get();
			status.selected_name.map(|name| {
				let details = status.selected_details.unwrap_or_default();
				view! {
					<div class="person-card">
						<h2>{name}</h2>
						<p>{details}</p>
					</div>
				}
			})
		}}
	}
}
