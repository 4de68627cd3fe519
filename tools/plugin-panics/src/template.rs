/// Line cap shared by every recorder a registry creates unless the host
/// configures another one at startup.
pub const DEFAULT_MAX_LINES: usize = 100;

/// Upper bound on lines a rendered report adds on top of the retained output:
/// the omission marker plus the template wrapper.
pub const REPORT_OVERHEAD_LINES: usize = 15;

/// Wraps captured panic output so the host crash report can tell a plugin
/// crash apart from a crash of the host itself.
pub fn render_plugin_panic(plugin: &str, body: &str) -> String {
    format!(
        "\nStack trace from the {plugin} plugin:\n\n{body}\n\n\
         Error: The {plugin} plugin crashed!\n\n\
         This is always a bug in the plugin rather than in the host. Please report\n\
         the crash to the plugin's maintainers; the output above should help them\n\
         diagnose it.\n"
    )
}

pub fn omission_marker(omitted: u64) -> String {
    if omitted == 1 {
        "... 1 line omitted ...".to_string()
    } else {
        format!("... {omitted} lines omitted ...")
    }
}

#[cfg(test)]
mod tests {
    use super::{omission_marker, render_plugin_panic, REPORT_OVERHEAD_LINES};

    #[test]
    fn template_names_the_plugin_twice_and_keeps_body_verbatim() {
        let out = render_plugin_panic("aws", "panic: boom\n  main.go:12");
        assert!(out.contains("Stack trace from the aws plugin:"));
        assert!(out.contains("Error: The aws plugin crashed!"));
        assert!(out.contains("\n\npanic: boom\n  main.go:12\n\n"));
    }

    #[test]
    fn template_overhead_fits_in_declared_slack() {
        let out = render_plugin_panic("p", "only");
        let wrapper = out.lines().count() - 1;
        // leaves room for the omission marker
        assert!(wrapper < REPORT_OVERHEAD_LINES);
    }

    #[test]
    fn marker_counts_omitted_lines() {
        assert_eq!(omission_marker(1), "... 1 line omitted ...");
        assert_eq!(omission_marker(42), "... 42 lines omitted ...");
    }
}
