//! Server-side rendering of the dashboard page.

use crate::config::DashboardConfig;
use crate::dashboard::{OverviewCell, StationView};
use crate::types::station::StationSheet;
use crate::web::page::{Page, OVERVIEW_PAGE};
use std::fmt::Write;

const STYLE: &str = "\
body{margin:0;font-family:sans-serif;display:flex;min-height:100vh}\
aside{width:260px;padding:16px;background:#f0f2f6;box-sizing:border-box}\
main{flex:1;padding:16px 32px;min-width:0}\
.select-title{font-size:20px;font-weight:bold;margin-bottom:8px}\
select,button{width:100%;padding:6px;margin:4px 0}\
table{border-collapse:collapse;font-size:14px;width:100%}\
th,td{border:1px solid #ddd;padding:4px 8px;text-align:right}\
th{background:#fafafa}\
.table-wrap{max-height:420px;overflow-y:auto;margin-bottom:24px}\
.grid{display:grid;grid-template-columns:1fr 1fr;gap:16px}\
.chart svg{max-width:100%;height:auto}\
.error{color:#b00020;background:#fde8e8;padding:8px 12px;border-radius:4px}\
img.splash{max-width:100%}";

/// What the main panel shows.
pub enum MainPanel<'a> {
    /// A failure that prevents the page from showing any data.
    PageError(String),
    Splash,
    Grid(&'a [OverviewCell]),
    Station(&'a StationView),
    /// A failure confined to the selected station.
    StationError { station: &'a str, message: String },
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_level(level: Option<f64>) -> String {
    level.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

/// Renders the full page: sidebar with selector and refresh control, then the main panel.
pub fn render_page(
    config: &DashboardConfig,
    stations: &[StationSheet],
    selected: &Page,
    panel: &MainPanel<'_>,
) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html lang=\"ko\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title><style>{}</style></head><body>",
        escape(&config.title),
        STYLE
    );
    render_sidebar(&mut html, config, stations, selected);
    let _ = write!(html, "<main><h1>{}</h1>", escape(&config.title));
    render_panel(&mut html, config, panel);
    html.push_str("</main></body></html>");
    html
}

fn render_sidebar(
    html: &mut String,
    config: &DashboardConfig,
    stations: &[StationSheet],
    selected: &Page,
) {
    html.push_str("<aside><hr><form method=\"get\" action=\"/\">");
    html.push_str("<div class=\"select-title\">지점 선택</div>");
    html.push_str("<select name=\"page\" onchange=\"this.form.submit()\">");
    let _ = write!(
        html,
        "<option value=\"{}\"{}>{}</option>",
        OVERVIEW_PAGE,
        if *selected == Page::Overview { " selected" } else { "" },
        escape(&config.overview_label)
    );
    for station in stations {
        let _ = write!(
            html,
            "<option value=\"{0}\"{1}>{0}</option>",
            escape(station.name()),
            if selected.is_selected(station.name()) { " selected" } else { "" }
        );
    }
    html.push_str("</select><noscript><button type=\"submit\">이동</button></noscript></form>");

    html.push_str("<hr><strong>프로그램 정보</strong><ul>");
    for note in &config.sidebar_notes {
        let _ = write!(html, "<li>{}</li>", escape(note));
    }
    html.push_str("</ul>");

    let _ = write!(
        html,
        "<form method=\"post\" action=\"/refresh\">\
         <input type=\"hidden\" name=\"page\" value=\"{}\">\
         <button type=\"submit\">데이터 업데이트</button></form></aside>",
        escape(selected.query_value())
    );
}

fn render_panel(html: &mut String, config: &DashboardConfig, panel: &MainPanel<'_>) {
    match panel {
        MainPanel::PageError(message) => {
            let _ = write!(
                html,
                "<div class=\"error\">데이터 로딩 실패: {}</div>",
                escape(message)
            );
        }
        MainPanel::Splash => {
            let _ = write!(html, "<p><strong>{}</strong></p>", escape(&config.splash_text));
            if !config.splash_image_url.is_empty() {
                let _ = write!(
                    html,
                    "<img class=\"splash\" src=\"{}\" alt=\"\">",
                    escape(&config.splash_image_url)
                );
            }
        }
        MainPanel::Grid(cells) => render_grid(html, cells),
        MainPanel::Station(view) => render_station(html, config, view),
        MainPanel::StationError { station, message } => {
            let _ = write!(
                html,
                "<p><strong>{}</strong></p><h3>{}</h3><div class=\"error\">{}</div>",
                escape(&config.disclaimer),
                escape(station),
                escape(message)
            );
        }
    }
}

fn render_grid(html: &mut String, cells: &[OverviewCell]) {
    html.push_str("<div class=\"grid\">");
    for cell in cells {
        let _ = write!(
            html,
            "<div class=\"cell\"><h3><a href=\"{}\">{}</a></h3>",
            escape(&Page::Station(cell.station.name().to_string()).href()),
            escape(cell.station.name())
        );
        match &cell.view {
            Ok(view) => {
                let _ = write!(html, "<div class=\"chart\">{}</div>", view.chart.svg);
            }
            Err(e) => {
                let _ = write!(html, "<div class=\"error\">{}</div>", escape(&e.to_string()));
            }
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
}

fn render_station(html: &mut String, config: &DashboardConfig, view: &StationView) {
    let labels = &config.column_labels;
    let _ = write!(
        html,
        "<p><strong>{}</strong></p><h3>{} 예측 데이터 (최근 {}개)</h3>",
        escape(&config.disclaimer),
        escape(view.station.name()),
        config.table_rows
    );
    let _ = write!(
        html,
        "<div class=\"table-wrap\"><table><thead><tr><th></th><th>{}</th><th>{}</th><th>{}</th><th>{}</th></tr></thead><tbody>",
        escape(&labels.timestamp),
        escape(&labels.actual_level),
        escape(&labels.pred_3h),
        escape(&labels.pred_6h)
    );
    for (idx, row) in view.rows.iter().enumerate() {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            idx,
            row.timestamp.format("%Y-%m-%d %H:%M"),
            format_level(row.actual_level),
            format_level(row.pred_3h),
            format_level(row.pred_6h)
        );
    }
    html.push_str("</tbody></table></div>");

    let _ = write!(
        html,
        "<h3>최근 {}시간 그래프</h3><div class=\"chart\">{}</div>",
        config.chart_window, view.chart.svg
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::renderer::{render, ChartOptions};
    use crate::types::observation::Observation;
    use chrono::NaiveDate;

    fn view() -> StationView {
        let station = StationSheet::parse("00123_Station").unwrap();
        let rows = vec![Observation {
            timestamp: NaiveDate::from_ymd_opt(2025, 5, 16)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            actual_level: None,
            pred_3h: Some(1.1),
            pred_6h: Some(1.234),
        }];
        let chart = render(&rows, station.name(), &ChartOptions::default()).unwrap();
        StationView {
            station,
            rows,
            total_rows: 1,
            chart,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape("수위"), "수위");
    }

    #[test]
    fn test_station_page_has_heading_table_and_chart() {
        let config = DashboardConfig::default();
        let view = view();
        let selected = Page::Station("00123_Station".to_string());
        let html = render_page(
            &config,
            std::slice::from_ref(&view.station),
            &selected,
            &MainPanel::Station(&view),
        );

        assert!(html.contains("00123_Station 예측 데이터 (최근 126개)"));
        assert!(html.contains("<option value=\"00123_Station\" selected>"));
        assert!(html.contains("<td>2025-05-16 10:00</td><td></td><td>1.10</td><td>1.23</td>"));
        assert!(html.contains("최근 24시간 그래프"));
        assert!(html.contains("<svg"));
        assert!(html.contains(&config.disclaimer));
    }

    #[test]
    fn test_splash_and_page_error() {
        let config = DashboardConfig::builder()
            .splash_image_url("/static/main.gif")
            .build();
        let splash = render_page(&config, &[], &Page::Overview, &MainPanel::Splash);
        assert!(splash.contains(&config.splash_text));
        assert!(splash.contains("src=\"/static/main.gif\""));
        assert!(splash.contains("<option value=\"Overview\" selected>메인페이지</option>"));

        let failed = render_page(
            &config,
            &[],
            &Page::Overview,
            &MainPanel::PageError("<timeout>".to_string()),
        );
        assert!(failed.contains("데이터 로딩 실패: &lt;timeout&gt;"));
        assert!(!failed.contains(&config.splash_text));
    }

    #[test]
    fn test_splash_image_defaults_to_bundled_asset() {
        let splash = render_page(&DashboardConfig::default(), &[], &Page::Overview, &MainPanel::Splash);
        assert!(splash.contains("<img class=\"splash\" src=\"/static/mainpage.svg\""));

        let config = DashboardConfig::builder().splash_image_url("").build();
        let plain = render_page(&config, &[], &Page::Overview, &MainPanel::Splash);
        assert!(!plain.contains("<img"));
    }
}
