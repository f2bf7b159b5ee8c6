use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;
use crate::audio::loader;
use crate::components::overview::Overview;
use crate::components::spectrogram::Spectrogram;
use crate::components::toolbar::{RegionPanel, Toolbar};
use crate::components::waveform::Waveform;
use crate::engine;
use crate::settings::{load_engine_config, load_prefs};
use crate::state::AppState;

/// Decode `file` in the background and hand it to the engine.
pub fn open_file(state: AppState, file: web_sys::File) {
    let name = file.name();
    state.loading.set(true);
    state.load_error.set(None);
    spawn_local(async move {
        match loader::load_file(file).await {
            Ok(signal) => {
                log::info!("Loaded {name}: {:.1}s at {} Hz", signal.duration_secs(), signal.sample_rate);
                engine::load(state, name, signal);
            }
            Err(e) => {
                log::error!("Failed to load {name}: {e}");
                state.load_error.set(Some(format!("{name}: {e}")));
            }
        }
        state.loading.set(false);
    });
}

#[component]
pub fn App() -> impl IntoView {
    let prefs = load_prefs();
    engine::init(load_engine_config());
    let state = AppState::new(&prefs);
    provide_context(state);
    on_cleanup(move || engine::teardown(state));

    view! {
        <div class="app">
            <Toolbar />
            <MainArea />
        </div>
    }
}

#[component]
fn MainArea() -> impl IntoView {
    let state = expect_context::<AppState>();
    let drag_over = RwSignal::new(false);

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        drag_over.set(false);
        let Some(file) = ev.data_transfer().and_then(|dt| dt.files()).and_then(|files| files.get(0)) else {
            return;
        };
        open_file(state, file);
    };

    view! {
        <div
            class=move || if drag_over.get() { "main drop-target" } else { "main" }
            on:dragover=move |ev: web_sys::DragEvent| {
                ev.prevent_default();
                drag_over.set(true);
            }
            on:dragleave=move |_| drag_over.set(false)
            on:drop=on_drop
        >
            <div class="tracks">
                <Spectrogram />
                <Waveform />
                <Overview />
            </div>
            {move || (!state.has_data() && !state.loading.get()).then(|| view! {
                <div class="empty-state">"Drop a WAV file here or use Open WAV"</div>
            })}
            <RegionPanel />
        </div>
    }
}
