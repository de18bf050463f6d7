use roster_manager_lib::domain::views::{AssignmentView, DashboardCounts};

pub fn show_assignments_debug_data(title: &str, views: &[AssignmentView]) {
    println!("\n=======================================================");
    println!("🗓️ [DEBUG] {} (計 {} 件)", title, views.len());
    println!("=======================================================");

    if views.is_empty() {
        println!("   (担当なし)");
    }
    for view in views {
        println!(
            "   ┣ {} {} : {:<12} [{}] ({} #{})",
            view.date_label, view.time, view.role, view.status, view.roster_name, view.occurrence_index
        );
    }
    println!("=======================================================\n");
}

pub fn show_dashboard_debug_data(counts: &DashboardCounts) {
    println!("\n=======================================================");
    println!("📋 [DEBUG] 管理者ダッシュボード");
    println!("=======================================================");
    println!("👥 メンバー: {} 人 (有効 {} 人)", counts.total_members, counts.active_members);
    println!("📅 ロスター: {} 件 / 担当 {} / {}", counts.roster_count, counts.filled_slots, counts.total_slots);
    println!(
        "📨 リクエスト: 保留 {} / 承認 {} / 却下 {}",
        counts.pending_requests, counts.approved_requests, counts.denied_requests
    );
    println!("=======================================================\n");
}
