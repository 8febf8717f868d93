//! Rendering seam and per-chart materialization.

use crate::chart::ChartSpec;
use crate::data::ChartData;
use crate::error::Result;
use crate::types::Table;

/// Draws a chart into PNG bytes.
pub trait ChartRenderer {
    /// Render `data` for `spec` as a PNG image.
    fn render(&self, spec: &ChartSpec, data: &ChartData) -> Result<Vec<u8>>;
}

/// A chart spec with whatever could be materialized for it.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub spec: ChartSpec,

    /// Resolved data; `None` if the spec could not be resolved.
    pub data: Option<ChartData>,

    /// PNG image; `None` if rendering failed or was skipped.
    pub image: Option<Vec<u8>>,
}

impl RenderedChart {
    /// Wrap a spec with nothing materialized.
    pub fn unresolved(spec: ChartSpec) -> Self {
        Self {
            spec,
            data: None,
            image: None,
        }
    }
}

/// Resolve and render each spec, in order.
///
/// Failures are logged and leave `data` or `image` empty for that chart only.
/// Passing no renderer skips image rendering.
pub fn render_charts(
    specs: &[ChartSpec],
    table: &Table,
    renderer: Option<&dyn ChartRenderer>,
) -> Vec<RenderedChart> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| render_chart(index + 1, spec, table, renderer))
        .collect()
}

fn render_chart(
    number: usize,
    spec: &ChartSpec,
    table: &Table,
    renderer: Option<&dyn ChartRenderer>,
) -> RenderedChart {
    let data = match ChartData::resolve(spec, table) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("Chart {} ({}): {}", number, spec.display_title(), e);
            return RenderedChart::unresolved(spec.clone());
        }
    };

    let image = renderer.and_then(|renderer| match renderer.render(spec, &data) {
        Ok(png) => Some(png),
        Err(e) => {
            log::warn!(
                "Chart {} ({}): image rendering failed, falling back to data preview: {}",
                number,
                spec.display_title(),
                e
            );
            None
        }
    });

    RenderedChart {
        spec: spec.clone(),
        data: Some(data),
        image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::enumerate;
    use crate::error::Error;
    use crate::types::CellValue::Number;

    /// Fails for one chart title, returns a fake PNG otherwise.
    struct FlakyRenderer {
        fail_title: &'static str,
    }

    impl ChartRenderer for FlakyRenderer {
        fn render(&self, spec: &ChartSpec, _data: &ChartData) -> Result<Vec<u8>> {
            if spec.display_title() == self.fail_title {
                Err(Error::RenderError("boom".to_string()))
            } else {
                Ok(vec![0x89, b'P', b'N', b'G'])
            }
        }
    }

    fn table() -> Table {
        Table::from_columns(
            "nums",
            vec![
                ("A".to_string(), vec![Number(1.0), Number(2.0)]),
                ("B".to_string(), vec![Number(2.0), Number(1.0)]),
            ],
        )
    }

    #[test]
    fn test_failure_is_contained() {
        let table = table();
        let specs = enumerate(&table);
        let renderer = FlakyRenderer {
            fail_title: "A vs B",
        };
        let charts = render_charts(&specs, &table, Some(&renderer));

        assert_eq!(charts.len(), specs.len());
        for (chart, spec) in charts.iter().zip(&specs) {
            assert_eq!(&chart.spec, spec);
            assert!(chart.data.is_some());
            assert_eq!(chart.image.is_none(), spec.display_title() == "A vs B");
        }
    }

    #[test]
    fn test_unresolvable_spec_and_no_renderer() {
        let table = table();
        let specs = vec![ChartSpec::histogram("Missing"), ChartSpec::histogram("A")];
        let charts = render_charts(&specs, &table, None);

        assert!(charts[0].data.is_none());
        assert!(charts[1].data.is_some());
        assert!(charts.iter().all(|c| c.image.is_none()));
    }
}
