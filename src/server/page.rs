//! server/page — chart page (Plotly, one line+marker trace per item).

use crate::series::{to_traces, SeriesMap};

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Pet Values - Stock Chart</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
</head>
<body>
    <h1>Pet Values (Stock Chart)</h1>
    <div id="chart" style="width:90%;height:600px;"></div>
    <script>
        const traces = "#;

const PAGE_TAIL: &str = r#";
        const layout = {
            title: 'Pet Values Over Time',
            xaxis: { title: 'Date' },
            yaxis: { title: 'Value', autorange: true },
            height: 600
        };
        Plotly.newPlot('chart', traces, layout);
    </script>
</body>
</html>
"#;

/// Full HTML page with the series embedded as Plotly traces.
pub fn render_chart_page(series: &SeriesMap) -> String {
    let traces = serde_json::to_string(&to_traces(series)).unwrap_or_else(|_| "[]".to_string());
    let mut out = String::with_capacity(PAGE_HEAD.len() + traces.len() + PAGE_TAIL.len());
    out.push_str(PAGE_HEAD);
    out.push_str(&script_safe(&traces));
    out.push_str(PAGE_TAIL);
    out
}

/// Item names come from a third-party page; keep them from closing the
/// script element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "<\\!--")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Point;

    #[test]
    fn names_cannot_close_the_script_tag() {
        let mut series = SeriesMap::new();
        series.insert(
            "</script><b>x".to_string(),
            vec![Point {
                timestamp: "t1".into(),
                value: 1,
            }],
        );
        let html = render_chart_page(&series);
        assert!(!html.contains("</script><b>x"));
        assert!(html.contains("<\\/script><b>x"));
    }

    #[test]
    fn empty_series_renders_empty_trace_list() {
        let html = render_chart_page(&SeriesMap::new());
        assert!(html.contains("const traces = [];"));
    }
}
