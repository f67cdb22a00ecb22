//! Server-rendered pages, one per navigation entry.
//!
//! Every page reads the session, never writes records. The only state a
//! page touches is the warning list (drained into flash messages) and a
//! stale edit form, which is dropped before rendering.

use super::forms::{self, FormError};
use super::html::{badge, button_form, escape, flashes, options, page};
use super::theme;
use crate::commands;
use crate::export::{self, ExportFormat};
use crate::models::summary::{Overview, Report, Tally, cases_by_client};
use crate::models::{
    Amount, Case, CaseStatus, Client, Document, Editable, EntityKind, Event, EventStatus,
    FieldKind, FieldSpec, Filter, PaymentStatus, Priority, Record, Searchable, Task, Transaction,
    parse_date,
};
use crate::session::{Session, Upload};
use crate::storage::Store;
use chrono::{Datelike, Days, NaiveDate};
use serde::Deserialize;

/// Query string accepted by the pages and the JSON API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    /// Free-text search
    pub q: Option<String>,
    /// Category key or label, `all` for every record
    pub status: Option<String>,
    /// Due-date cutoff, `YYYY-MM-DD`
    pub due: Option<String>,
    /// Calendar month, `YYYY-MM`
    pub month: Option<String>,
    /// Client name on the cases-by-client page
    pub client: Option<String>,
}

impl PageQuery {
    /// Filter for the list; an unparseable due date is returned as an error
    /// message and leaves the cutoff inactive.
    pub fn filter(&self) -> (Filter, Option<String>) {
        let mut filter = Filter::new();
        if let Some(text) = &self.q {
            filter = filter.with_text(text.as_str());
        }
        if let Some(status) = &self.status {
            filter = filter.with_category(status.as_str());
        }
        let mut error = None;
        if let Some(due) = self.due.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            match parse_date(due) {
                Some(date) => filter = filter.with_due_cutoff(date),
                None => error = Some(format!("invalid date '{}'", due)),
            }
        }
        (filter, error)
    }
}

/// A record type with its own list page.
pub trait Page: Editable + Searchable {
    /// Navigation path of the page.
    const PATH: &'static str;
    const TITLE: &'static str;
    /// Whether the create form takes a file.
    const UPLOAD: bool = false;

    /// Options of the category filter, empty when the type has none.
    fn categories() -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    /// Content shown above the list.
    fn preamble(_session: &Session, _query: &PageQuery) -> String {
        String::new()
    }

    /// Store a record from a submitted create form.
    fn insert(session: &mut Session, record: Self, _upload: Option<Upload>) -> usize {
        session.create(record)
    }

    /// Links added to the row actions.
    fn row_links(&self) -> String {
        String::new()
    }
}

impl Page for Client {
    const PATH: &'static str = "/clients";
    const TITLE: &'static str = "Clientes";

    fn row_links(&self) -> String {
        format!(
            r#"<a class="button" href="/cases-by-client?client={}">Casos</a>"#,
            urlencoding::encode(&self.name)
        )
    }
}

impl Page for Case {
    const PATH: &'static str = "/cases";
    const TITLE: &'static str = "Casos";

    fn categories() -> Vec<(&'static str, &'static str)> {
        CaseStatus::options()
    }
}

impl Page for Task {
    const PATH: &'static str = "/tasks";
    const TITLE: &'static str = "Tarefas";

    fn categories() -> Vec<(&'static str, &'static str)> {
        Priority::options()
    }
}

impl Page for Event {
    const PATH: &'static str = "/calendar";
    const TITLE: &'static str = "Agenda";

    fn categories() -> Vec<(&'static str, &'static str)> {
        EventStatus::options()
    }

    fn preamble(session: &Session, query: &PageQuery) -> String {
        calendar(session, query)
    }
}

impl Page for Transaction {
    const PATH: &'static str = "/finance";
    const TITLE: &'static str = "Financeiro";

    fn categories() -> Vec<(&'static str, &'static str)> {
        PaymentStatus::options()
    }

    fn preamble(session: &Session, _query: &PageQuery) -> String {
        let report = Report::compute(session.store());
        cards(&[
            (report.income.to_currency(), "Receitas"),
            (report.expenses.to_currency(), "Despesas"),
            (report.pending.to_currency(), "Pendente"),
            (report.balance.to_currency(), "Saldo"),
        ])
    }
}

impl Page for Document {
    const PATH: &'static str = "/documents";
    const TITLE: &'static str = "Documentos";
    const UPLOAD: bool = true;

    fn insert(session: &mut Session, record: Self, upload: Option<Upload>) -> usize {
        session.attach_document(record, upload)
    }
}

/// Page path listing records of `kind`.
pub fn page_path(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Client => Client::PATH,
        EntityKind::Case => Case::PATH,
        EntityKind::Task => Task::PATH,
        EntityKind::Event => Event::PATH,
        EntityKind::Transaction => Transaction::PATH,
        EntityKind::Document => Document::PATH,
    }
}

fn count(store: &Store, kind: EntityKind) -> usize {
    match kind {
        EntityKind::Client => store.clients.len(),
        EntityKind::Case => store.cases.len(),
        EntityKind::Task => store.tasks.len(),
        EntityKind::Event => store.events.len(),
        EntityKind::Transaction => store.transactions.len(),
        EntityKind::Document => store.documents.len(),
    }
}

fn cards(items: &[(String, &str)]) -> String {
    let mut out = String::from(r#"<div class="cards">"#);
    for (value, label) in items {
        out.push_str(&format!(
            r#"<div class="card"><div class="value">{}</div><div class="label">{}</div></div>"#,
            escape(value),
            escape(label)
        ));
    }
    out.push_str("</div>");
    out
}

fn export_links(kind: EntityKind) -> String {
    [ExportFormat::Xlsx, ExportFormat::Pdf]
        .iter()
        .map(|format| {
            format!(
                r#"<a class="button" href="/export/{}">{}</a>"#,
                export::file_name(kind, *format),
                format.extension().to_uppercase()
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// === Record lists ===

fn cell<T: Editable>(record: &T, spec: &FieldSpec) -> String {
    let value = record.field(spec.key);
    match spec.kind {
        FieldKind::Choice(choices) => choices()
            .into_iter()
            .find(|(key, _)| *key == value)
            .map(|(key, label)| badge(key, label))
            .unwrap_or_default(),
        FieldKind::Amount => value
            .parse::<Amount>()
            .map(Amount::to_currency)
            .unwrap_or_else(|_| escape(&value)),
        _ if spec.key == "file" && value.starts_with("http") => format!(
            r#"<a href="{0}" target="_blank" rel="noopener">{0}</a>"#,
            escape(&value)
        ),
        _ => escape(&value),
    }
}

/// Table of records with edit and delete buttons; indexes are positions
/// in the full collection.
fn table<T: Page>(rows: &[(usize, &T)]) -> String {
    if rows.is_empty() {
        return r#"<p class="muted">Nenhum registro encontrado.</p>"#.to_string();
    }
    let plural = T::KIND.plural();
    let mut out = String::from("<table><thead><tr><th>#</th>");
    for spec in T::FIELDS {
        out.push_str(&format!("<th>{}</th>", escape(spec.label)));
    }
    out.push_str("<th></th></tr></thead><tbody>");
    for (index, record) in rows {
        out.push_str(&format!("<tr><td>{}</td>", index));
        for spec in T::FIELDS {
            out.push_str(&format!("<td>{}</td>", cell(*record, spec)));
        }
        out.push_str(&format!(
            r#"<td class="actions">{}{} {}</td></tr>"#,
            record.row_links(),
            button_form(&format!("/records/{}/{}/edit", plural, index), "Editar", "secondary"),
            button_form(&format!("/records/{}/{}/delete", plural, index), "Excluir", "danger"),
        ));
    }
    out.push_str("</tbody></table>");
    out
}

fn filter_form<T: Page>(query: &PageQuery) -> String {
    let mut out = format!(
        r#"<form class="filters" method="get" action="{}"><label>Buscar<br><input type="search" name="q" value="{}"></label>"#,
        T::PATH,
        escape(query.q.as_deref().unwrap_or(""))
    );
    let categories = T::categories();
    if !categories.is_empty() {
        let mut choices = vec![("all", "Todos")];
        choices.extend(categories);
        out.push_str(&format!(
            r#"<label>Status<br><select name="status">{}</select></label>"#,
            options(&choices, query.status.as_deref().unwrap_or("all"))
        ));
    }
    if T::DATED {
        out.push_str(&format!(
            r#"<label>Prazo até<br><input type="date" name="due" value="{}"></label>"#,
            escape(query.due.as_deref().unwrap_or(""))
        ));
    }
    if let Some(month) = &query.month {
        out.push_str(&format!(
            r#"<input type="hidden" name="month" value="{}">"#,
            escape(month)
        ));
    }
    out.push_str(&format!(
        r#"<button type="submit">Filtrar</button> <a href="{}">Limpar</a></form>"#,
        T::PATH
    ));
    out
}

/// The open form for `T`, if any: the submitted values after a failed
/// save, the record being edited, or a blank create form.
fn open_form<T: Page>(session: &Session, error: Option<&FormError>) -> String {
    let ui = session.ui();
    let editing = ui.editing(T::KIND);
    if let Some(error) = error {
        return forms::render::<T>(&error.values, editing, Some(&error.message), T::UPLOAD);
    }
    if let Some(index) = editing {
        return match session.store().get::<T>(index) {
            Some(record) => {
                forms::render::<T>(&forms::values_of(record), Some(index), None, T::UPLOAD)
            }
            None => String::new(),
        };
    }
    if ui.is_creating(T::KIND) {
        return forms::render::<T>(&forms::values_of(&T::default()), None, None, T::UPLOAD);
    }
    String::new()
}

/// List page for `T`: filters, toolbar, open form, table.
pub fn entity_page<T: Page>(
    session: &mut Session,
    query: &PageQuery,
    error: Option<&FormError>,
) -> String {
    session.resolve_edit::<T>();
    let warnings = session.take_warnings();
    let (filter, filter_error) = query.filter();
    let kind = T::KIND;

    let mut body = flashes(&warnings, &filter_error.into_iter().collect::<Vec<_>>());
    body.push_str(&T::preamble(session, query));
    body.push_str(&filter_form::<T>(query));
    body.push_str(&format!(
        r#"<div class="cards">{} {}</div>"#,
        button_form(
            &format!("/records/{}/new", kind.plural()),
            &format!("Adicionar {}", kind.label()),
            ""
        ),
        export_links(kind)
    ));
    body.push_str(&open_form::<T>(session, error));
    body.push_str(&table::<T>(&filter.apply(session.store().all::<T>())));
    page(T::TITLE, T::PATH, &body)
}

// === Overview ===

fn event_rows(events: &[Event]) -> String {
    if events.is_empty() {
        return r#"<p class="muted">Nenhum evento agendado.</p>"#.to_string();
    }
    let mut out = String::from(
        "<table><thead><tr><th>Data/Hora</th><th>Título</th><th>Tipo</th><th>Local</th><th>Status</th></tr></thead><tbody>",
    );
    for event in events {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&event.field("starts_at")),
            escape(&event.title),
            badge(event.kind.as_str(), event.kind.label()),
            escape(&event.location),
            badge(event.status.as_str(), event.status.label()),
        ));
    }
    out.push_str("</tbody></table>");
    out
}

pub fn overview(session: &mut Session) -> String {
    let warnings = session.take_warnings();
    let overview = Overview::compute(session.store());
    let mut body = flashes(&warnings, &[]);
    body.push_str(&cards(&[
        (overview.clients.to_string(), "Clientes"),
        (overview.cases.to_string(), "Casos"),
        (overview.tasks.to_string(), "Tarefas"),
        (overview.balance.to_currency(), "Saldo"),
    ]));
    body.push_str("<h2>Próximos eventos</h2>");
    body.push_str(&event_rows(&overview.upcoming));
    page("Visão Geral", "/overview", &body)
}

// === Calendar ===

const MONTHS: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

fn parse_month(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").ok()
}

/// First day of the month `delta` months away from `first`.
fn shift_month(first: NaiveDate, delta: i32) -> NaiveDate {
    let months = first.year() * 12 + first.month0() as i32 + delta;
    NaiveDate::from_ymd_opt(months.div_euclid(12), months.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(first)
}

fn month_link(first: NaiveDate, label: &str) -> String {
    format!(
        r#"<a class="button" href="/calendar?month={}">{}</a>"#,
        first.format("%Y-%m"),
        label
    )
}

/// Month grid starting on Monday, with each event in its day cell.
fn calendar(session: &Session, query: &PageQuery) -> String {
    let today = chrono::Local::now().date_naive();
    let first = query
        .month
        .as_deref()
        .and_then(parse_month)
        .unwrap_or_else(|| shift_month(today, 0));
    let last = shift_month(first, 1) - Days::new(1);
    let start = first - Days::new(u64::from(first.weekday().num_days_from_monday()));
    let end = last + Days::new(u64::from(6 - last.weekday().num_days_from_monday()));
    let events = commands::events_between(session, start, end);

    let mut out = format!(
        r#"<p>{} <strong>{} de {}</strong> {}</p><table class="calendar"><thead><tr>"#,
        month_link(shift_month(first, -1), "‹"),
        MONTHS[first.month0() as usize],
        first.year(),
        month_link(shift_month(first, 1), "›"),
    );
    for name in ["Seg", "Ter", "Qua", "Qui", "Sex", "Sáb", "Dom"] {
        out.push_str(&format!("<th>{}</th>", name));
    }
    out.push_str("</tr></thead><tbody>");
    for day in start.iter_days().take_while(|d| *d <= end) {
        if day.weekday().num_days_from_monday() == 0 {
            out.push_str("<tr>");
        }
        let class = if day.month() == first.month() { "" } else { r#" class="other""# };
        out.push_str(&format!(r#"<td{}><span class="day">{}</span>"#, class, day.day()));
        for item in events
            .iter()
            .filter(|e| e.record.starts_at.is_some_and(|at| at.date() == day))
        {
            let event = &item.record;
            let time = event
                .starts_at
                .map(|at| at.format("%H:%M").to_string())
                .unwrap_or_default();
            out.push_str(&format!(
                r#"<span class="event" style="background: {}" title="{}">{} {}</span>"#,
                theme::badge_color(event.kind.as_str()),
                escape(&event.summary()),
                time,
                escape(&event.title)
            ));
        }
        out.push_str("</td>");
        if day.weekday().num_days_from_monday() == 6 {
            out.push_str("</tr>");
        }
    }
    out.push_str("</tbody></table>");
    out
}

// === Cases by client ===

pub fn cases_by_client_page(session: &mut Session, query: &PageQuery) -> String {
    let warnings = session.take_warnings();
    let selected = query.client.as_deref().unwrap_or("").trim();
    let store = session.store();

    let mut names: Vec<&str> = Vec::new();
    for client in store.clients.all() {
        if !names.contains(&client.name.as_str()) {
            names.push(client.name.as_str());
        }
    }
    let mut choices = vec![("", "Selecione um cliente")];
    choices.extend(names.iter().map(|n| (*n, *n)));

    let mut body = flashes(&warnings, &[]);
    body.push_str(&format!(
        r#"<form class="filters" method="get" action="/cases-by-client"><label>Cliente<br><select name="client">{}</select></label><button type="submit">Ver casos</button></form>"#,
        options(&choices, selected)
    ));
    if !selected.is_empty() {
        let cases = cases_by_client(store.cases.all(), selected);
        body.push_str(&format!(
            "<h2>{} caso(s) de {}</h2>",
            cases.len(),
            escape(selected)
        ));
        body.push_str(&table::<Case>(&cases));
    }
    page("Casos por Cliente", "/cases-by-client", &body)
}

// === Reports ===

fn tally_table(title: &str, tallies: &[Tally]) -> String {
    let mut out = format!("<h2>{}</h2><table><tbody>", escape(title));
    for tally in tallies {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            badge(tally.key, tally.label),
            tally.count
        ));
    }
    out.push_str("</tbody></table>");
    out
}

pub fn reports(session: &mut Session) -> String {
    let warnings = session.take_warnings();
    let store = session.store();
    let report = Report::compute(store);

    let mut body = flashes(&warnings, &[]);
    body.push_str(&cards(&[
        (report.income.to_currency(), "Receitas"),
        (report.expenses.to_currency(), "Despesas"),
        (report.pending.to_currency(), "Pendente"),
        (report.balance.to_currency(), "Saldo"),
    ]));
    body.push_str(&tally_table("Casos por status", &report.cases_by_status));
    body.push_str(&tally_table("Tarefas por prioridade", &report.tasks_by_priority));
    body.push_str(&tally_table("Eventos por status", &report.events_by_status));

    body.push_str("<h2>Exportar</h2><table><tbody>");
    for kind in EntityKind::ALL {
        body.push_str(&format!(
            r#"<tr><td><a href="{}">{}</a></td><td>{}</td><td class="actions">{}</td></tr>"#,
            page_path(kind),
            kind.sheet_name(),
            count(store, kind),
            export_links(kind)
        ));
    }
    body.push_str("</tbody></table>");
    page("Relatórios", "/reports", &body)
}
