//! Tests for dependency extraction and ordering

use super::*;

mod extraction_tests {
    use super::*;

    #[test]
    fn test_simple_from() {
        assert_eq!(extract_table_references("SELECT * FROM users"), vec!["users"]);
    }

    #[test]
    fn test_joins_and_qualified_names() {
        let sql = "SELECT o.id FROM shop.orders o JOIN `shop`.`users` u ON u.id = o.user_id \
                   LEFT JOIN [dbo].[order items] AS i ON i.order_id = o.id";
        assert_eq!(
            extract_table_references(sql),
            vec!["orders", "users", "order items"]
        );
    }

    #[test]
    fn test_comma_separated_from_list() {
        assert_eq!(
            extract_table_references("select * from a x, b as y, \"c\" where x.id = y.id"),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_ignores_literals_comments_and_subqueries() {
        let sql = "SELECT 'from fake' AS t -- from other\n\
                   FROM (SELECT id FROM real_table) sub /* join ghost */";
        assert_eq!(extract_table_references(sql), vec!["real_table"]);
    }

    #[test]
    fn test_table_functions_are_skipped() {
        assert!(extract_table_references("SELECT * FROM generate_series(1, 3)").is_empty());
    }

    #[test]
    fn test_duplicates_collapse_case_insensitively() {
        assert_eq!(
            extract_table_references("SELECT * FROM Users JOIN users ON true"),
            vec!["Users"]
        );
    }
}

mod graph_tests {
    use super::*;

    #[test]
    fn test_dependents_of() {
        let mut graph = DependencyGraph::new();
        graph.add_object("v_orders", vec!["orders".into()]);
        graph.add_object("v_totals", vec!["v_orders".into()]);
        assert_eq!(graph.dependents_of("v_orders"), vec!["v_totals"]);
        assert_eq!(graph.depends_on("v_totals"), ["v_orders".to_string()]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_topological_order_puts_dependencies_first() {
        let order = order_by_dependencies(&[
            ("v_report".into(), "SELECT * FROM v_totals".into()),
            ("v_totals".into(), "SELECT sum(x) FROM v_base".into()),
            ("v_base".into(), "SELECT x FROM orders".into()),
            ("v_other".into(), "SELECT 1 FROM users".into()),
        ]);
        assert_eq!(order, vec!["v_base", "v_totals", "v_report", "v_other"]);
    }

    #[test]
    fn test_independent_objects_keep_input_order() {
        let order = order_by_dependencies(&[
            ("b".into(), "SELECT * FROM t1".into()),
            ("a".into(), "SELECT * FROM t2".into()),
        ]);
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_cycles_still_emit_every_object() {
        let order = order_by_dependencies(&[
            ("x".into(), "SELECT * FROM y".into()),
            ("y".into(), "SELECT * FROM x".into()),
            ("z".into(), "SELECT * FROM x".into()),
        ]);
        assert_eq!(order.len(), 3);
        assert_eq!(order, vec!["x", "y", "z"]);
    }
}
