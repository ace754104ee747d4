use clap::{Arg, Command};
use tracing::info;

use nblsim::logging::{self, LogConfig, LogOutput};
use nblsim::scenario::ScenarioConfig;
use nblsim::simulation::{RunReport, SimulationEngine};

/// 組み込みデモ: 浮力調整の成功・失敗とEVAミッションの完遂
const DEMO_SCENARIOS: [(&str, &str); 3] = [
    (
        "A: 体重75kg, バラスト2kg, フロート1個",
        r#"
meta:
  version: "1.0"
  name: demo_a_neutral
  description: 許容幅の境界で中性浮力に成功
sim:
  dt_s: 0.1
  t_max_s: 6.0
actions:
  - { at_s: 0.0, action: start_session, body_weight_kg: 75.0 }
  - { at_s: 0.2, action: adjust_weight, delta_kg: 2.0 }
  - { at_s: 0.3, action: adjust_floaties, delta: 1 }
  - { at_s: 0.5, action: run_test }
"#,
    ),
    (
        "B: 体重90kg, バラスト10kg, フロートなし",
        r#"
meta:
  version: "1.0"
  name: demo_b_too_heavy
  description: バラスト過多で沈降し失敗
sim:
  dt_s: 0.1
  t_max_s: 6.0
actions:
  - { at_s: 0.0, action: start_session, body_weight_kg: 90.0 }
  - { at_s: 0.2, action: adjust_weight, delta_kg: 10.0 }
  - { at_s: 0.5, action: run_test }
"#,
    ),
    (
        "C: EVAミッションのタスクを順に完了",
        r#"
meta:
  version: "1.0"
  name: demo_c_eva
  description: 船外活動ミッションを制限時間内に完遂
sim:
  dt_s: 0.1
  t_max_s: 30.0
actions:
  - { at_s: 0.0, action: select_mission, mission_id: eva }
  - { at_s: 0.0, action: start_mission }
  - { at_s: 5.0, action: complete_task, task_id: 1 }
  - { at_s: 10.0, action: complete_task, task_id: 2 }
  - { at_s: 15.0, action: complete_task, task_id: 3 }
  - { at_s: 20.0, action: complete_task, task_id: 4 }
"#,
    ),
];

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("nblsim")
        .version("0.1.0")
        .about("中性浮力訓練シミュレーション (Neutral Buoyancy Lab Simulation)")
        .long_about("宇宙飛行士の中性浮力訓練を再現するシミュレーションシステム\n\
                     浮力調整・時間制限付きミッション・実績解除を時間刻みで評価します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合は使用方法を表示します。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("test")
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みデモシナリオを実行")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("realtime")
                .short('r')
                .long("realtime")
                .action(clap::ArgAction::SetTrue)
                .help("実時間に合わせて実行")
        )
        .arg(
            Arg::new("speed")
                .long("speed")
                .value_name("X")
                .value_parser(clap::value_parser!(f64))
                .default_value("1.0")
                .help("実時間実行の倍速")
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(clap::ArgAction::SetTrue)
                .help("実行結果をJSONで出力")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    // ログ設定
    let base_level = matches
        .get_one::<String>("log-level")
        .map(|s| logging::parse_log_level(s))
        .unwrap_or(tracing::Level::INFO);
    let output = match matches
        .get_one::<String>("log-output")
        .map(|s| s.parse::<LogOutput>())
        .unwrap_or(Ok(LogOutput::Console))
    {
        Ok(output) => output,
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    };
    let log_config = LogConfig {
        level: logging::level_for_verbosity(base_level, verbose_level),
        output,
        ..LogConfig::default()
    };

    if output.writes_file() {
        if let Err(e) = logging::ensure_log_directory(&log_config.log_dir) {
            eprintln!("エラー: ログディレクトリを作成できません: {}", e);
            std::process::exit(1);
        }
    }
    // ファイル出力のガードはプロセス終了まで保持
    let _log_guard = match logging::init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    println!("中性浮力訓練シミュレーション - nblsim v0.1.0");
    println!();

    if verbose_level > 0 {
        println!("詳細出力レベル: {}", verbose_level);
    }

    let speed = matches.get_one::<f64>("speed").copied().unwrap_or(1.0);
    if !speed.is_finite() || speed <= 0.0 {
        eprintln!("エラー: --speed には正の有限値を指定してください: {}", speed);
        std::process::exit(1);
    }

    let options = RunOptions {
        realtime: matches.get_flag("realtime"),
        speed,
        json: matches.get_flag("json"),
        verbose_level,
    };

    // デモモードの実行
    if matches.get_flag("test") {
        println!("=== デモシナリオ実行モード ===");
        if let Err(e) = run_demo(&options) {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // シナリオファイルの処理
    if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        match run_scenario(scenario_path, matches.get_flag("info"), &options) {
            Ok(_) => {
                if verbose_level > 0 {
                    println!("シナリオ実行が正常に完了しました。");
                }
            }
            Err(e) => {
                eprintln!("エラー: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        show_default_help();
    }
}

/// 実行方法の指定
struct RunOptions {
    realtime: bool,
    speed: f64,
    json: bool,
    verbose_level: u8,
}

/// 組み込みデモシナリオを順に実行
fn run_demo(options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    for (label, yaml) in DEMO_SCENARIOS {
        println!();
        println!("--- シナリオ {} ---", label);
        let scenario = ScenarioConfig::from_yaml(yaml)?;
        execute_scenario(scenario, options)?;
    }

    println!();
    println!("全てのデモシナリオが完了しました！");
    Ok(())
}

/// シナリオファイルを読み込んで実行
fn run_scenario(
    scenario_path: &str,
    info_only: bool,
    options: &RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;
    info!("シナリオファイル読み込み完了: {}", scenario_path);

    // 情報表示のみの場合
    if info_only {
        scenario.print_summary();
        return Ok(());
    }

    scenario.print_summary();
    println!();
    execute_scenario(scenario, options)
}

/// シナリオの実行
fn execute_scenario(
    scenario: ScenarioConfig,
    options: &RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = SimulationEngine::from_scenario(scenario, options.verbose_level)?;

    let report: RunReport = if options.realtime {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(engine.run_realtime(options.speed))
    } else {
        engine.run()
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_summary();
    }
    Ok(())
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  nblsim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>   シナリオファイルを指定して実行");
    println!("  -i, --info              シナリオ情報のみ表示");
    println!("  -t, --test              組み込みデモシナリオを実行");
    println!("  -r, --realtime          実時間に合わせて実行");
    println!("      --speed <X>         実時間実行の倍速");
    println!("      --json              実行結果をJSONで出力");
    println!("      --log-level <LEVEL> ログレベル");
    println!("      --log-output <OUT>  ログ出力先 (console, file, both)");
    println!("  -v, --verbose           詳細出力 (複数指定で詳細レベル上昇)");
    println!("  -h, --help              このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/buoyancy_basic.yaml   - 浮力調整の基本訓練");
    println!("  scenarios/mission_timeout.yaml  - 制限時間切れのミッション");
    println!("  scenarios/lunar_descent.yaml    - 月面降下と岩石回収");
    println!();
    println!("例:");
    println!("  nblsim -s scenarios/buoyancy_basic.yaml");
    println!("  nblsim -s scenarios/buoyancy_basic.yaml -v");
    println!("  nblsim -s scenarios/lunar_descent.yaml -i");
    println!("  nblsim -s scenarios/mission_timeout.yaml -r --speed 10");
    println!("  nblsim --test");
}
