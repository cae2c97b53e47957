use crate::components::ui::{Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Spinner};
use crate::markdown::render_preview;
use crate::models::Note;
use crate::state::note_sync::AutosaveScheduler;
use crate::state::{refresh_notes, AppContext};
use crate::util::format_time_hm;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_navigate;
use session::SaveState;
use wasm_bindgen::JsCast;

pub(crate) mod session;

/// The open note: toolbar (save status, preview/raw toggle, delete) above a
/// preview pane or a raw-markdown textarea.
///
/// Keystrokes flow into the autosave scheduler; this component never talks
/// to the update endpoint itself. Delete is the exception: it cancels the
/// pending autosave first, then issues the request here.
#[component]
pub fn Editor(note: Note) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let scheduler = expect_context::<AutosaveScheduler>();
    let navigate = use_navigate();

    // Seed (or resume) the session before anything can type into it.
    scheduler.open(&note);

    let buffer: RwSignal<String> = RwSignal::new(
        scheduler
            .buffer(&note.id)
            .unwrap_or_else(|| note.content.clone()),
    );

    let preview: RwSignal<bool> = RwSignal::new(true);
    let deleting: RwSignal<bool> = RwSignal::new(false);
    let delete_error: RwSignal<Option<String>> = RwSignal::new(None);

    let save_state = {
        let scheduler = scheduler.clone();
        let id = note.id.clone();
        Signal::derive(move || scheduler.save_state(&id).unwrap_or(SaveState::Clean))
    };

    // Toolbar clock: last ack in this session, else the fetched timestamp.
    let note_updated_ms = note.updated_at.timestamp_millis();
    let last_saved = {
        let scheduler = scheduler.clone();
        let id = note.id.clone();
        Signal::derive(move || {
            format_time_hm(scheduler.last_saved_ms(&id).unwrap_or(note_updated_ms))
        })
    };

    let on_input = {
        let scheduler = scheduler.clone();
        let id = note.id.clone();
        move |ev: web_sys::Event| {
            let v = ev
                .target()
                .and_then(|t| t.dyn_into::<web_sys::HtmlTextAreaElement>().ok())
                .map(|t| t.value())
                .unwrap_or_else(|| buffer.get_untracked());

            buffer.set(v.clone());
            scheduler.on_edit(&id, &v);
        }
    };

    let on_retry = {
        let scheduler = scheduler.clone();
        let id = note.id.clone();
        move |_| scheduler.retry(&id)
    };

    let on_delete = {
        let note = note.clone();
        let scheduler = scheduler.clone();
        let app_state = app_state.clone();
        let navigate = navigate.clone();
        move |_| {
            let confirmed = window()
                .confirm_with_message("Are you sure you want to delete this note?")
                .unwrap_or(false);
            if !confirmed {
                return;
            }

            // The delete supersedes any pending autosave for this id; the
            // timer must be cancelled before the request goes out.
            scheduler.cancel(&note.id);

            deleting.set(true);
            delete_error.set(None);

            let api_client = app_state.0.api_client.get_untracked();
            let note2 = note.clone();
            let scheduler2 = scheduler.clone();
            let app_state2 = app_state.clone();
            let navigate2 = navigate.clone();
            spawn_local(async move {
                match api_client.delete(&note2.id).await {
                    Ok(()) => {
                        refresh_notes(app_state2);
                        navigate2("/", Default::default());
                    }
                    Err(e) => {
                        delete_error.set(Some(e.to_string()));

                        // The note is still there; resume the session so
                        // autosave keeps working.
                        scheduler2.open(&note2);
                        let current = buffer.get_untracked();
                        if current != note2.content {
                            scheduler2.on_edit(&note2.id, &current);
                        }
                    }
                }
                deleting.set(false);
            });
        }
    };

    view! {
        <div class="flex h-full flex-col bg-background">
            <div class="z-10 flex items-center justify-between border-b border-border px-6 py-3">
                <div class="flex items-center gap-4 font-mono text-xs text-muted-foreground">
                    <span>{move || save_state.get().to_string()}</span>
                    <span>{move || last_saved.get()}</span>

                    // Reserve space to avoid layout shift/flicker.
                    <div class="h-4 w-4 shrink-0">
                        <Show when=move || save_state.get() == SaveState::Saving fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                    </div>

                    <Show when=move || save_state.get() == SaveState::Failed fallback=|| ().into_view()>
                        <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=on_retry.clone()>
                            "Retry"
                        </Button>
                    </Show>
                </div>

                <div class="flex items-center gap-2">
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Sm
                        on:click=move |_| preview.update(|p| *p = !*p)
                    >
                        {move || if preview.get() { "Edit" } else { "Preview" }}
                    </Button>

                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Sm
                        class="text-destructive"
                        attr:disabled=move || deleting.get()
                        on:click=on_delete
                    >
                        "Delete"
                    </Button>
                </div>
            </div>

            <Show when=move || delete_error.get().is_some() fallback=|| ().into_view()>
                {move || delete_error.get().map(|e| view! {
                    <Alert class="m-4 border-destructive/30">
                        <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                    </Alert>
                })}
            </Show>

            <div class="flex-1 overflow-y-auto">
                <div class="mx-auto min-h-full w-full max-w-3xl px-8 py-12">
                    <Show
                        when=move || preview.get()
                        fallback=move || view! {
                            <textarea
                                class="h-full min-h-[70vh] w-full resize-none bg-transparent font-mono leading-relaxed text-foreground outline-none"
                                placeholder="Start writing..."
                                spellcheck="false"
                                autofocus=true
                                prop:value=move || buffer.get()
                                on:input=on_input.clone()
                            ></textarea>
                        }
                    >
                        <div
                            class="prose prose-stone max-w-none"
                            inner_html=move || render_preview(&buffer.get())
                        ></div>
                    </Show>
                </div>
            </div>
        </div>
    }
}
