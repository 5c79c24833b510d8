use pretty_assertions::assert_eq;
use std::sync::Arc;
use xref_graph::{
    AnalysisConfig, AnalysisError, AnalysisScope, Analyzer, Batch, CancellationToken,
    ExtractionCache, ProjectContext, ResolutionState, SiteKind, SizeThresholds, SourceInput,
    Stage, UnparsableReason, Verdict,
};

fn batch(files: &[(&str, &str)]) -> Batch {
    Batch::new(files.iter().map(|(path, src)| SourceInput::new(*path, *src)))
}

async fn analyze(files: &[(&str, &str)]) -> ProjectContext {
    Analyzer::new(AnalysisConfig::default())
        .unwrap()
        .analyze(batch(files))
        .await
        .unwrap()
}

const PROJECT: &[(&str, &str)] = &[
    (
        "app/main.py",
        "from flask import Flask\nfrom app.views import index\n\napp = Flask(__name__)\n",
    ),
    (
        "app/views.py",
        "from app import models\n\ndef index():\n    return render(models.User)\n",
    ),
    (
        "app/models.py",
        "from app.views import index\n\nclass User:\n    pass\n",
    ),
    (
        "web/client.js",
        "import { format } from './format';\nimport axios from 'axios';\n\nexport function load() {\n  return format(axios.get('/'));\n}\n",
    ),
    (
        "web/format.js",
        "export const format = (x) => x;\n",
    ),
];

#[tokio::test]
async fn test_analysis_is_deterministic() {
    let first = analyze(PROJECT).await;
    let second = analyze(PROJECT).await;
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());

    let mut reversed: Vec<(&str, &str)> = PROJECT.to_vec();
    reversed.reverse();
    let third = analyze(&reversed).await;
    assert_eq!(first.to_json().unwrap(), third.to_json().unwrap());
}

#[tokio::test]
async fn test_project_overview() {
    let context = analyze(PROJECT).await;

    let paths: Vec<&str> = context.units().iter().map(|u| u.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "app/main.py",
            "app/models.py",
            "app/views.py",
            "web/client.js",
            "web/format.js",
        ]
    );

    let edges: Vec<(&str, &str)> = context
        .edges()
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str()))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("app/main.py", "app/views.py"),
            ("app/models.py", "app/views.py"),
            ("app/views.py", "app/models.py"),
            ("web/client.js", "web/format.js"),
        ]
    );

    let flask = context
        .imports_of("app/main.py")
        .find(|r| r.specifier == "flask")
        .unwrap();
    assert_eq!(flask.state, ResolutionState::External);
    assert_eq!(
        context.external_dependencies(),
        vec!["axios".to_string(), "flask".to_string()]
    );

    let cycles: Vec<Vec<&str>> = context
        .cycles()
        .iter()
        .map(|c| c.units.iter().map(String::as_str).collect())
        .collect();
    assert_eq!(cycles, vec![vec!["app/models.py", "app/views.py"]]);

    let undefined: Vec<(&str, &str)> = context
        .findings()
        .iter()
        .map(|f| (f.unit.as_str(), f.symbol.as_str()))
        .collect();
    assert_eq!(undefined, vec![("app/views.py", "render")]);

    assert_eq!(context.frameworks()[0].name, "flask");
}

#[tokio::test]
async fn test_usage_resolved_elsewhere() {
    let context = analyze(&[
        ("a.py", "def run():\n    return helper()\n"),
        ("b.py", "def helper():\n    return 1\n"),
    ])
    .await;

    assert_eq!(context.findings().len(), 1);
    let finding = &context.findings()[0];
    assert_eq!(finding.unit, "a.py");
    assert_eq!(finding.site, SiteKind::Usage);
    assert_eq!(finding.verdict, Verdict::ResolvedElsewhere);
    assert_eq!(
        finding.suggestion.as_deref(),
        Some("available in `b.py`; add an import for `helper` from `b.py`")
    );
}

#[tokio::test]
async fn test_usage_ambiguous_lists_every_candidate() {
    let context = analyze(&[
        ("a.py", "def run():\n    return helper()\n"),
        ("b.py", "def helper():\n    return 1\n"),
        ("c.py", "def helper():\n    return 2\n"),
    ])
    .await;

    assert_eq!(context.findings().len(), 1);
    let finding = &context.findings()[0];
    assert_eq!(finding.verdict, Verdict::Ambiguous);
    assert_eq!(finding.candidates, vec!["b.py".to_string(), "c.py".to_string()]);
    let suggestion = finding.suggestion.as_deref().unwrap();
    assert!(suggestion.contains("`b.py`") && suggestion.contains("`c.py`"));
}

#[tokio::test]
async fn test_usage_undefined() {
    let context = analyze(&[
        ("a.py", "def run():\n    return helper()\n"),
        ("b.py", "def other():\n    return 1\n"),
    ])
    .await;

    assert_eq!(context.findings().len(), 1);
    assert_eq!(context.findings()[0].verdict, Verdict::Undefined);
    assert!(context.findings()[0].suggestion.is_none());
}

#[tokio::test]
async fn test_imported_usage_is_satisfied() {
    let context = analyze(&[
        ("a.py", "from b import helper\n\ndef run():\n    return helper()\n"),
        ("b.py", "def helper():\n    return 1\n"),
    ])
    .await;

    assert!(context.findings().is_empty());
    assert_eq!(context.dependencies_of("a.py"), vec!["b.py"]);
}

#[tokio::test]
async fn test_renamed_local_export_satisfies_import() {
    let context = analyze(&[
        ("src/a.js", "import { publicName } from './b';\n\npublicName();\n"),
        ("src/b.js", "function impl() {}\nexport { impl as publicName };\n"),
    ])
    .await;

    assert!(context.findings().is_empty(), "{:?}", context.findings());
    assert_eq!(context.dependencies_of("src/a.js"), vec!["src/b.js"]);
}

#[tokio::test]
async fn test_two_unit_cycle() {
    let cyclic = analyze(&[("a.py", "import b\n"), ("b.py", "import a\n")]).await;
    assert_eq!(cyclic.cycles().len(), 1);
    assert!(cyclic.cycles()[0].contains("a.py") && cyclic.cycles()[0].contains("b.py"));

    let acyclic = analyze(&[("a.py", "import b\n"), ("b.py", "import os\n")]).await;
    assert!(acyclic.cycles().is_empty());
}

#[tokio::test]
async fn test_self_import_reported_separately() {
    let context = analyze(&[("a.py", "import a\n"), ("b.py", "x = 1\n")]).await;
    assert!(context.cycles().is_empty());
    assert_eq!(context.self_imports(), ["a.py".to_string()]);
}

#[tokio::test]
async fn test_malformed_unit_does_not_abort_batch() {
    let context = Analyzer::new(AnalysisConfig::default())
        .unwrap()
        .analyze(Batch::new([
            SourceInput::new("broken.py", "def broken(:\n    pass\n"),
            SourceInput::new("binary.py", vec![0x78, 0x20, 0x3d, 0xff, 0xfe]),
            SourceInput::new("ok.py", "def fine():\n    return 1\n"),
        ]))
        .await
        .unwrap();

    assert_eq!(context.units().len(), 3);
    let broken = context.unit("broken.py").unwrap();
    assert!(!broken.is_parsed());
    assert!(matches!(
        broken.status.reason(),
        Some(UnparsableReason::Syntax { .. })
    ));
    assert!(matches!(
        context.unit("binary.py").unwrap().status.reason(),
        Some(UnparsableReason::InvalidEncoding { .. })
    ));

    let ok = context.unit("ok.py").unwrap();
    assert!(ok.is_parsed());
    assert_eq!(ok.symbols[0].name, "fine");
    assert_eq!(context.summary().unparsable, 2);
}

#[tokio::test]
async fn test_framework_detected_from_majority_imports() {
    let context = analyze(&[
        ("api/users.py", "from fastapi import APIRouter\n\nrouter = APIRouter()\n"),
        ("api/items.py", "from fastapi import APIRouter\n\nrouter = APIRouter()\n"),
        ("api/app.py", "from fastapi import FastAPI\n\napp = FastAPI()\n"),
        ("core/math.py", "def add(a, b):\n    return a + b\n"),
        ("core/text.py", "def upper(s):\n    return s.upper()\n"),
    ])
    .await;

    let verdict = &context.frameworks()[0];
    assert_eq!(verdict.name, "fastapi");
    assert!(verdict.confidence >= xref_graph::DEFAULT_MIN_CONFIDENCE);
    assert_eq!(verdict.evidence[0].units.len(), 3);

    let plain = analyze(&[
        ("core/math.py", "def add(a, b):\n    return a + b\n"),
        ("core/text.py", "def upper(s):\n    return s.upper()\n"),
    ])
    .await;
    assert!(plain.frameworks().is_empty());
}

#[tokio::test]
async fn test_cancelled_analysis_returns_no_context() {
    let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let err = analyzer
        .analyze_with_cancel(batch(PROJECT), &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(matches!(
        err,
        AnalysisError::Cancelled {
            stage: Stage::Extraction
        }
    ));
}

#[tokio::test]
async fn test_invalid_batches_fail_fast() {
    let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();

    let empty = analyzer.analyze(Batch::new([])).await.unwrap_err();
    assert!(matches!(empty, AnalysisError::EmptyBatch));

    let duplicate = analyzer
        .analyze(batch(&[("pkg/a.py", "x = 1\n"), ("pkg//a.py", "y = 2\n")]))
        .await
        .unwrap_err();
    assert!(matches!(duplicate, AnalysisError::DuplicatePath(_)));

    let escaping = analyzer
        .analyze(batch(&[("../outside.py", "x = 1\n")]))
        .await
        .unwrap_err();
    assert!(matches!(escaping, AnalysisError::InvalidPath(_)));
}

#[tokio::test]
async fn test_size_classes_and_scope() {
    let analyzer = Analyzer::new(AnalysisConfig {
        size_thresholds: Some(
            SizeThresholds::from_cut_points([("optimal", 1), ("warning", 3)], "critical")
                .unwrap(),
        ),
        ..AnalysisConfig::default()
    })
    .unwrap();

    let context = analyzer
        .analyze(
            Batch::new([
                SourceInput::rebased("/repo/src/one.py", "x = 1\n"),
                SourceInput::rebased("/repo/src/three.py", "x = 1\ny = 2\nz = 3\n"),
                SourceInput::rebased("/repo/src/five.py", "a = 1\nb = 2\nc = 3\nd = 4\ne = 5\n"),
            ])
            .with_root("/repo")
            .with_scope(AnalysisScope::Module),
        )
        .await
        .unwrap();

    assert_eq!(context.scope(), AnalysisScope::Module);
    let classes: Vec<(&str, Option<&str>)> = context
        .units()
        .iter()
        .map(|u| (u.path.as_str(), u.size_class.as_deref()))
        .collect();
    assert_eq!(
        classes,
        vec![
            ("src/five.py", Some("critical")),
            ("src/one.py", Some("optimal")),
            ("src/three.py", Some("warning")),
        ]
    );
}

#[tokio::test]
async fn test_shared_cache_reuses_extractions() {
    let cache = Arc::new(ExtractionCache::default());
    let analyzer = Analyzer::new(AnalysisConfig::default())
        .unwrap()
        .with_cache(Arc::clone(&cache));

    let first = analyzer.analyze(batch(PROJECT)).await.unwrap();
    let stats = cache.stats();
    assert_eq!(stats.misses, PROJECT.len() as u64);

    let second = analyzer.analyze(batch(PROJECT)).await.unwrap();
    assert_eq!(cache.stats().hits, PROJECT.len() as u64);
    assert_eq!(first, second);
}
