// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Per-page state shared by the engines, the interceptor and the control.
//!
//! A `PageContext` is a cheap handle; clones share one state. Everything runs
//! on the local task set of the current thread, so the state sits behind a
//! `RefCell` and no borrow is held across an await point.

use actix_web::rt::task::JoinHandle;
use actix_web::rt::time::sleep;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::dom::Document;
use crate::lookup::{SearchQuery, SearchResultPage};

use super::filter::{self, FilterReport, FilterSelection};
use super::interceptor::{InterceptingTransport, RefreshMatcher, Transport};
use super::observer::ObservationLoop;
use super::repair::{self, RepairReport};
use super::select::{LookupSource, TagSelect};
use super::snapshot::{BoardSnapshot, SnapshotError};
use super::toolbar::{self, InjectOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub root_doc: String,
    pub debounce: Duration,
    pub refresh_delay: Duration,
    pub refresh_path: String,
    pub observe_character_data: bool,
}

impl PageSettings {
    pub fn from_config(root_doc: &str, client: &ClientConfig) -> Self {
        Self {
            root_doc: root_doc.to_string(),
            debounce: client.debounce(),
            refresh_delay: client.refresh_delay(),
            refresh_path: client.refresh_path.clone(),
            observe_character_data: client.observe_character_data,
        }
    }

    pub fn lookup_path(&self) -> String {
        crate::lookup::lookup_path(&self.root_doc)
    }

    pub fn observation_loop(&self) -> ObservationLoop {
        ObservationLoop::new(self.observe_character_data)
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        Self::from_config("", &ClientConfig::default())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineReport {
    pub repair: RepairReport,
    pub filter: FilterReport,
    pub injected: bool,
}

struct PageState {
    document: Document,
    location: String,
    settings: PageSettings,
    selection: FilterSelection,
    snapshot: Option<BoardSnapshot>,
    intercepted: bool,
    control: Option<TagSelect>,
    lookup: Option<Rc<dyn LookupSource>>,
}

#[derive(Clone)]
pub struct PageContext {
    state: Rc<RefCell<PageState>>,
}

impl PageContext {
    pub fn new(document: Document, location: &str, settings: PageSettings) -> Self {
        Self {
            state: Rc::new(RefCell::new(PageState {
                document,
                location: location.to_string(),
                settings,
                selection: FilterSelection::default(),
                snapshot: None,
                intercepted: false,
                control: None,
                lookup: None,
            })),
        }
    }

    pub fn with_lookup(self, source: Rc<dyn LookupSource>) -> Self {
        self.state.borrow_mut().lookup = Some(source);
        self
    }

    pub fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.state.borrow_mut().document)
    }

    /// Serialized page body.
    pub fn html(&self) -> String {
        let state = self.state.borrow();
        state.document.inner_html(state.document.root())
    }

    pub fn settings(&self) -> PageSettings {
        self.state.borrow().settings.clone()
    }

    pub fn selection(&self) -> FilterSelection {
        self.state.borrow().selection.clone()
    }

    pub fn snapshot(&self) -> Option<BoardSnapshot> {
        self.state.borrow().snapshot.clone()
    }

    /// A copy of the injected control's state, if the control exists.
    pub fn control(&self) -> Option<TagSelect> {
        self.state.borrow().control.clone()
    }

    /// Wrap the host's request dispatcher. Only the first call wraps; later
    /// calls hand the transport back as is.
    pub fn intercept(&self, transport: Rc<dyn Transport>) -> Rc<dyn Transport> {
        let refresh_path = {
            let mut state = self.state.borrow_mut();
            if state.intercepted {
                log::debug!("VisualFix: request dispatcher already intercepted");
                return transport;
            }
            state.intercepted = true;
            state.settings.refresh_path.clone()
        };
        Rc::new(InterceptingTransport::new(
            transport,
            self.clone(),
            RefreshMatcher::new(&refresh_path),
        ))
    }

    /// Use `snapshot` as the card metadata without scheduling anything.
    pub fn set_snapshot(&self, snapshot: BoardSnapshot) {
        self.state.borrow_mut().snapshot = Some(snapshot);
    }

    /// Store a board refresh payload as the latest card metadata and schedule
    /// a filter pass. Returns the number of cards captured.
    pub fn capture_board_refresh(&self, body: &str) -> Result<usize, SnapshotError> {
        let snapshot = BoardSnapshot::from_json(body)?;
        let cards = snapshot.len();
        let delay = {
            let mut state = self.state.borrow_mut();
            state.snapshot = Some(snapshot);
            state.settings.refresh_delay
        };
        self.schedule_recompute(delay);
        Ok(cards)
    }

    /// Recompute filters once `delay` has passed, with whatever selection and
    /// snapshot are current by then.
    pub fn schedule_recompute(&self, delay: Duration) -> JoinHandle<()> {
        let context = self.clone();
        actix_web::rt::spawn(async move {
            sleep(delay).await;
            context.recompute_filters();
            context.pump();
        })
    }

    pub fn recompute_filters(&self) -> FilterReport {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let root = state.document.root();
        filter::apply(
            &mut state.document,
            root,
            &state.selection,
            state.snapshot.as_ref(),
        )
    }

    /// One pass of repair, filter/annotate and toolbar injection.
    pub fn run_engines(&self) -> EngineReport {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let root = state.document.root();

        let repair = repair::repair(&mut state.document, root);
        let filter = filter::apply(
            &mut state.document,
            root,
            &state.selection,
            state.snapshot.as_ref(),
        );
        let injected = match toolbar::inject(&mut state.document, root, &state.location) {
            InjectOutcome::Injected { container, select } => {
                if state.control.is_some() {
                    log::debug!("VisualFix: toolbar was re-rendered, tag filter recreated");
                }
                state.selection = FilterSelection::default();
                state.control = Some(TagSelect::new(container, select));
                true
            }
            _ => false,
        };

        EngineReport {
            repair,
            filter,
            injected,
        }
    }

    /// Run the engines on the freshly loaded page, then settle.
    pub fn boot(&self) -> EngineReport {
        let report = self.run_engines();
        self.pump();
        report
    }

    /// Drain pending mutations through the observation loop.
    pub fn pump(&self) -> usize {
        let observer = self.state.borrow().settings.observation_loop();
        observer.pump(self)
    }

    /// Debounced search: only the latest term typed within the debounce
    /// window is fetched.
    pub fn search(&self, term: &str) -> JoinHandle<()> {
        let generation = self
            .state
            .borrow_mut()
            .control
            .as_mut()
            .map(TagSelect::begin_query);
        let delay = self.state.borrow().settings.debounce;
        let query = SearchQuery::new(term, 1);
        let context = self.clone();
        actix_web::rt::spawn(async move {
            let Some(generation) = generation else {
                log::debug!("VisualFix: no tag filter on this page, search ignored");
                return;
            };
            sleep(delay).await;
            if !context.is_current(generation) {
                return;
            }
            context.fetch_results(query, false).await;
        })
    }

    /// Fetch the next page of the current term, if there is one.
    pub fn load_more(&self) -> Option<JoinHandle<()>> {
        let query = {
            let state = self.state.borrow();
            let control = state.control.as_ref()?;
            if !control.has_more() {
                return None;
            }
            control.query().next_page()
        };
        let context = self.clone();
        Some(actix_web::rt::spawn(async move {
            context.fetch_results(query, true).await;
        }))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state
            .borrow()
            .control
            .as_ref()
            .is_some_and(|control| control.is_current(generation))
    }

    /// Show the page for `query`, from the cache when it was fetched before.
    /// A failed lookup shows no results.
    pub async fn fetch_results(&self, query: SearchQuery, append: bool) {
        let cached = self
            .state
            .borrow()
            .control
            .as_ref()
            .and_then(|control| control.cached(&query));

        let page = match cached {
            Some(page) => page,
            None => {
                let source = self.state.borrow().lookup.clone();
                match source {
                    None => {
                        log::warn!("VisualFix: no tag lookup source configured");
                        SearchResultPage::default()
                    }
                    Some(source) => match source.fetch(query.clone()).await {
                        Ok(page) => {
                            if let Some(control) = self.state.borrow_mut().control.as_mut() {
                                control.remember(query.clone(), page.clone());
                            }
                            page
                        }
                        Err(err) => {
                            log::error!("VisualFix: {}", err);
                            SearchResultPage::default()
                        }
                    },
                }
            }
        };

        {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let Some(control) = state.control.as_mut() else {
                return;
            };
            control.apply_page(query, page, append);
            control.render(&mut state.document);
        }
        self.pump();
    }

    /// The user picked tags in the control, identified by tag id.
    pub fn set_selection(&self, ids: &[u64]) {
        let names = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let Some(control) = state.control.as_mut() else {
                log::warn!("VisualFix: no tag filter on this page, selection ignored");
                return;
            };
            control.choose(ids);
            control.render(&mut state.document);
            control.selected_names()
        };
        self.apply_filter_names(&names);
    }

    /// Filter the board by tag display names and mirror them into the host
    /// search bar.
    pub fn apply_filter_names(&self, names: &[String]) -> FilterReport {
        self.state.borrow_mut().selection = FilterSelection::new(names);
        let report = self.recompute_filters();
        {
            let mut state = self.state.borrow_mut();
            let root = state.document.root();
            toolbar::sync_search_bar(&mut state.document, root, names);
        }
        self.pump();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::interceptor::{HostRequest, HostResponse, TransportError};
    use futures_util::future::LocalBoxFuture;

    const PAGE: &str = r#"<div class="kanban" data-itemtype="Project"><div class="kanban-toolbar"><div class="search-input"><span class="search-input-tag-input"></span></div></div><div class="kanban-item" id="Project-1"><div class="kanban-item-content"><span class="badge">urgent</span></div></div><div class="kanban-item" id="Project-2"><div class="kanban-item-content"></div></div></div>"#;

    fn context() -> PageContext {
        PageContext::new(
            Document::parse(PAGE),
            "/front/project.form.php?id=1",
            PageSettings::default(),
        )
    }

    #[test]
    fn boot_injects_control() {
        let context = context();
        let report = context.boot();
        assert!(report.injected);
        assert!(context.control().is_some());
        assert!(context.html().contains("visualfix-tags-filter"));
        assert!(!context.run_engines().injected);
    }

    #[test]
    fn apply_filter_names_hides_and_syncs() {
        let context = context();
        context.boot();
        let report = context.apply_filter_names(&["Urgent".to_string()]);
        assert_eq!(report.cards, 2);
        assert_eq!(report.hidden, 1);

        context.with_document(|document| {
            let root = document.root();
            let hidden = document.select(root, ".visualfix-filtered-out");
            assert_eq!(hidden.len(), 1);
            assert_eq!(document.attr(hidden[0], "id"), Some("Project-2"));
            let input = document.select_first(root, ".search-input-tag-input").unwrap();
            assert_eq!(document.text_content(input), "tag:Urgent ");
        });
    }

    #[test]
    fn recreated_toolbar_resets_selection() {
        let context = context();
        context.boot();
        context.apply_filter_names(&["urgent".to_string()]);
        assert!(!context.selection().is_empty());

        context.with_document(|document| {
            let root = document.root();
            let filter = document.select_first(root, ".visualfix-tags-filter").unwrap();
            document.remove(filter);
        });
        context.pump();

        assert!(context.selection().is_empty());
        let hidden = context.with_document(|document| {
            let root = document.root();
            document.select(root, ".visualfix-filtered-out").len()
        });
        assert_eq!(hidden, 0);
    }

    #[test]
    fn character_data_changes_need_opt_in() {
        let context = context();
        context.boot();
        context.with_document(|document| {
            let root = document.root();
            let badge = document.select_first(root, ".badge").unwrap();
            let text = document.children(badge)[0];
            document.set_text_content(text, "billing");
        });
        assert_eq!(context.pump(), 0);

        let settings = PageSettings {
            observe_character_data: true,
            ..PageSettings::default()
        };
        let watching = PageContext::new(Document::parse(PAGE), "/front/project.php", settings);
        watching.boot();
        watching.with_document(|document| {
            let root = document.root();
            let badge = document.select_first(root, ".badge").unwrap();
            let text = document.children(badge)[0];
            document.set_text_content(text, "billing");
            assert!(document.has_pending_mutations());
        });
        assert_eq!(watching.pump(), 1);
    }

    #[test]
    fn intercept_wraps_once() {
        struct Null;
        impl Transport for Null {
            fn dispatch(
                &self,
                _request: HostRequest,
            ) -> LocalBoxFuture<'static, Result<HostResponse, TransportError>> {
                Box::pin(async { Err(TransportError::Aborted) })
            }
        }

        let context = context();
        let inner: Rc<dyn Transport> = Rc::new(Null);
        let wrapped = context.intercept(inner.clone());
        assert!(!Rc::ptr_eq(&wrapped, &inner));
        let again = context.intercept(inner.clone());
        assert!(Rc::ptr_eq(&again, &inner));
    }
}
