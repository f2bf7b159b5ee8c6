use leptos::prelude::*;
use sonoscope_core::coords::FreqScale;
use sonoscope_core::types::{FeatureType, RegionId};
use wasm_bindgen::JsCast;
use crate::audio::playback;
use crate::components::app::open_file;
use crate::engine;
use crate::settings::save_prefs;
use crate::state::AppState;

/// Playback speeds offered in the toolbar. Below 1 slows the recording
/// down (and drops its pitch).
pub const PLAYBACK_RATES: &[f64] = &[0.05, 0.1, 0.125, 0.25, 0.5, 1.0, 2.0];

pub fn rate_label(rate: f64) -> String {
    if rate >= 1.0 {
        format!("{}×", rate)
    } else {
        format!("1/{}×", (1.0 / rate).round() as u32)
    }
}

fn select_value(ev: &web_sys::Event) -> Option<String> {
    let target = ev.target()?;
    Some(target.unchecked_into::<web_sys::HtmlSelectElement>().value())
}

#[component]
pub fn Toolbar() -> impl IntoView {
    let state = expect_context::<AppState>();

    let on_file = move |ev: web_sys::Event| {
        let Some(input) = ev.target().map(|t| t.unchecked_into::<web_sys::HtmlInputElement>()) else { return };
        if let Some(file) = input.files().and_then(|f| f.get(0)) {
            open_file(state, file);
        }
        input.set_value("");
    };

    let on_scale = move |ev: web_sys::Event| {
        let Some(scale) = select_value(&ev).and_then(|v| v.parse::<usize>().ok()).and_then(|i| FreqScale::ALL.get(i).copied())
        else {
            return;
        };
        engine::command(state, |e, now| e.set_scale(scale, now));
        state.scale.set(scale);
        save_prefs(&state.prefs());
    };

    let on_rate = move |ev: web_sys::Event| {
        let Some(rate) = select_value(&ev).and_then(|v| v.parse::<f64>().ok()) else { return };
        engine::command(state, |e, now| e.set_playback_rate(rate, now));
        playback::set_rate(rate);
        state.playback_rate.set(rate);
        save_prefs(&state.prefs());
    };

    let toggle_play = move |_| {
        if state.is_playing.get_untracked() {
            playback::stop(state);
        } else {
            let from = state.view.get_untracked().map(|v| v.start).unwrap_or(0.0);
            playback::play(state, from);
        }
    };

    let toggle_lock = move |_| {
        state.drawing_locked.update(|l| *l = !*l);
        engine::apply_gate(state);
    };

    view! {
        <div class="toolbar">
            <span class="toolbar-brand"><b>"sono"</b><i>"scope"</i></span>

            <label class="toolbar-file">
                "Open WAV"
                <input type="file" accept=".wav,audio/wav" style="display: none" on:change=on_file />
            </label>
            <span class="toolbar-file-name">
                {move || state.file_name.get().unwrap_or_else(|| "No file".to_string())}
            </span>

            <select title="Frequency scale" on:change=on_scale prop:disabled=move || !state.has_data()>
                {FreqScale::ALL.iter().enumerate().map(|(i, s)| {
                    let s = *s;
                    view! {
                        <option value=i.to_string() selected=move || state.scale.get() == s>{s.label()}</option>
                    }
                }).collect_view()}
            </select>

            <select title="Playback speed" on:change=on_rate>
                {PLAYBACK_RATES.iter().map(|&r| view! {
                    <option value=r.to_string() selected=move || state.playback_rate.get() == r>{rate_label(r)}</option>
                }).collect_view()}
            </select>

            <button
                prop:disabled=move || !state.has_data()
                on:click=move |_| {
                    engine::command(state, |e, now| {
                        if let Err(err) = e.zoom_to_full(now) {
                            log::debug!("Zoom to full rejected: {err}");
                        }
                    });
                }
                title="Show the whole recording (Home)"
            >"Full"</button>

            <button
                class=move || if state.is_playing.get() { "toolbar-play-btn active" } else { "toolbar-play-btn" }
                prop:disabled=move || !state.has_data()
                on:click=toggle_play
                title="Play from the left edge of the view (Space)"
            >{move || if state.is_playing.get() { "Stop" } else { "Play" }}</button>

            <button
                class=move || if state.drawing_locked.get() { "toolbar-lock-btn active" } else { "toolbar-lock-btn" }
                on:click=toggle_lock
                title="Lock or unlock feature drawing"
            >{move || if state.drawing_locked.get() { "Drawing locked" } else { "Drawing unlocked" }}</button>

            <div style="flex: 1;"></div>

            {move || state.loading.get().then(|| view! { <span class="toolbar-status">"Loading…"</span> })}
            {move || state.load_error.get().map(|e| view! { <span class="toolbar-error">{e}</span> })}
        </div>
    }
}

/// Regions of the loaded recording and the features of the active one.
#[component]
pub fn RegionPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    let new_region = move |_| {
        let Some(view) = state.view.get_untracked() else { return };
        let created = engine::command(state, |e, now| {
            let id = e.create_region(view).map_err(|err| err.to_string())?;
            e.zoom_to_region(id, now).map_err(|err| err.to_string())?;
            Ok::<RegionId, String>(id)
        });
        match created {
            Some(Ok(id)) => log::info!("Created region {id}"),
            Some(Err(err)) => log::warn!("Could not create region: {err}"),
            None => {}
        }
    };

    view! {
        <div class="region-panel">
            <div class="region-panel-header">
                <span>"Regions"</span>
                <button prop:disabled=move || !state.has_data() on:click=new_region>"New region from view"</button>
            </div>
            <ul class="region-list">
                {move || state.regions.get().into_iter().map(|region| {
                    let id = region.id;
                    let is_active = move || state.active_region.get() == Some(id);
                    view! {
                        <li class=move || if is_active() { "region-item active" } else { "region-item" }>
                            <span
                                class="region-name"
                                on:click=move |_| {
                                    engine::command(state, |e, now| {
                                        if let Err(err) = e.zoom_to_region(id, now) {
                                            log::debug!("Zoom to {id} rejected: {err}");
                                        }
                                    });
                                }
                            >
                                {format!("{id}  {:.2}s – {:.2}s  ({} features)",
                                    region.start_time, region.end_time, region.features.len())}
                            </span>
                            <button
                                title="Delete region"
                                on:click=move |_| {
                                    engine::command(state, |e, now| {
                                        if let Err(err) = e.delete_region(id, now) {
                                            log::warn!("Could not delete {id}: {err}");
                                        }
                                    });
                                }
                            >"×"</button>
                        </li>
                    }
                }).collect_view()}
            </ul>
            <FeatureList />
        </div>
    }
}

#[component]
fn FeatureList() -> impl IntoView {
    let state = expect_context::<AppState>();

    let features = move || {
        let active = state.active_region.get()?;
        state.regions.with(|rs| rs.iter().find(|r| r.id == active).map(|r| r.features.clone()))
    };

    view! {
        {move || features().map(|features| view! {
            <ul class="feature-list">
                {features.into_iter().map(|feature| {
                    let index = feature.index;
                    let editing = move || state.editing.get() == Some(index);
                    let bounds = feature.bounds().map(|(t0, t1, f0, f1)| {
                        format!("{:.3}–{:.3}s, {:.0}–{:.0} Hz", t0, t1, f0, f1)
                    }).unwrap_or_else(|| "not drawn".to_string());
                    let current_type = feature.feature_type;
                    view! {
                        <li class=move || if editing() { "feature-item editing" } else { "feature-item" }>
                            <span
                                class="feature-index"
                                on:click=move |_| {
                                    let next = if editing() { None } else { Some(index) };
                                    engine::command(state, |e, _| e.select_feature(next));
                                }
                            >{format!("#{index}")}</span>
                            <span class="feature-bounds">{bounds}</span>
                            <select on:change=move |ev: web_sys::Event| {
                                let Some(t) = select_value(&ev)
                                    .and_then(|v| v.parse::<usize>().ok())
                                    .and_then(|i| FeatureType::ALL.get(i).copied())
                                else { return };
                                engine::command(state, |e, _| {
                                    if let Err(err) = e.set_feature_type(index, t) {
                                        log::warn!("Could not relabel feature {index}: {err}");
                                    }
                                });
                            }>
                                {FeatureType::ALL.iter().enumerate().map(|(i, t)| view! {
                                    <option value=i.to_string() selected=*t == current_type>{t.label()}</option>
                                }).collect_view()}
                            </select>
                            <input
                                type="text"
                                placeholder="Notes"
                                prop:value=feature.notes.clone()
                                on:change=move |ev: web_sys::Event| {
                                    let Some(input) = ev.target().map(|t| t.unchecked_into::<web_sys::HtmlInputElement>()) else { return };
                                    let notes = input.value();
                                    engine::command(state, |e, _| {
                                        if let Err(err) = e.set_feature_notes(index, &notes) {
                                            log::warn!("Could not save notes for feature {index}: {err}");
                                        }
                                    });
                                }
                            />
                            <button
                                title="Delete feature"
                                on:click=move |_| {
                                    engine::command(state, |e, _| {
                                        if let Err(err) = e.delete_feature(index) {
                                            log::warn!("Could not delete feature {index}: {err}");
                                        }
                                    });
                                }
                            >"×"</button>
                        </li>
                    }
                }).collect_view()}
            </ul>
        })}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_labels_read_as_fractions_below_real_time() {
        assert_eq!(rate_label(1.0), "1×");
        assert_eq!(rate_label(2.0), "2×");
        assert_eq!(rate_label(0.1), "1/10×");
        assert_eq!(rate_label(0.125), "1/8×");
    }
}
