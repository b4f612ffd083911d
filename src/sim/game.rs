//! Run orchestrator: entity partitions, the phase machine, and the
//! collision pass.

use std::mem;

use glam::Vec2;
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::audio::{MusicTrack, SoundCue};
use crate::consts;
use crate::persistence::{SaveData, SaveStore, UpgradeKind};

use super::bosses::{self, Boss, BossCtx, BossId, PlayerRef};
use super::bullet::{self, Bullet};
use super::effects::{self, FloatingText, Particle, PowerUp, PowerUpKind, ScreenShake};
use super::enemy::Enemy;
use super::entity::{EntityId, IdGen};
use super::geom;
use super::hazards::{GravityWell, Hazard, HazardKind, Singularity, SlowZone};
use super::interact::{self, InteractAction, Interactable};
use super::obstacle::Obstacle;
use super::player::{HitOutcome, Player, PlayerCtx, TempBuff};
use super::scheduler::{DeferredAction, Owner, Scheduler};
use super::stages::STAGES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    Hub,
    Playing,
    BossIntro,
    Intermission,
    UpgradeScreen,
    LoreScreen,
    TestChamber,
    Victory,
    GameOver,
}

/// One frame of shell input. `interact` is a one-shot key press, the rest
/// are held states.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
    pub dash: bool,
    pub ultimate: bool,
    pub interact: bool,
    pub cursor: Vec2,
}

/// Read-only view of the sim for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub stage: i32,
    pub stage_name: Option<&'static str>,
    pub wave: i32,
    pub shards: u32,
    pub run_shards: u32,
    pub player: Option<PlayerStatus>,
    pub boss: Option<BossStatus>,
    pub prompt: Option<&'static str>,
    pub intermission_choices: Vec<TempBuff>,
    pub shake: f32,
    pub enemies: usize,
    pub bullets: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    pub health: f32,
    pub max_health: f32,
    pub ultimate: f32,
    pub shielded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BossStatus {
    pub name: &'static str,
    pub health: f32,
    pub max_health: f32,
    pub phase: u8,
}

pub struct Game {
    pub phase: GamePhase,
    pub save: SaveData,

    rng: Pcg32,
    ids: IdGen,
    store: Box<dyn SaveStore>,

    pub player: Option<Player>,
    pub enemies: Vec<Enemy>,
    pub bosses: Vec<Boss>,
    pub player_bullets: Vec<Bullet>,
    pub enemy_bullets: Vec<Bullet>,
    pub obstacles: Vec<Obstacle>,
    pub powerups: Vec<PowerUp>,
    pub hazards: Vec<Hazard>,
    pub slow_zones: Vec<SlowZone>,
    pub singularities: Vec<Singularity>,
    pub particles: Vec<Particle>,
    pub floating_text: Vec<FloatingText>,
    pub interactables: Vec<Interactable>,
    pub well: Option<GravityWell>,
    pub shake: ScreenShake,

    scheduler: Scheduler,
    current_boss: Option<(EntityId, &'static str)>,
    stage: i32,
    wave: i32,
    to_spawn: u32,
    spawn_timer: f32,
    intro_timer: f32,
    test_mode: bool,
    shards_run: u32,
    intermission_choices: Vec<TempBuff>,
    highlighted: Option<usize>,

    cues: Vec<SoundCue>,
    music: Option<MusicTrack>,
}

impl Game {
    pub fn new(seed: u64, store: Box<dyn SaveStore>) -> Self {
        let save = match store.load() {
            Ok(save) => save,
            Err(e) => {
                warn!("could not load save, starting fresh: {e}");
                SaveData::default()
            }
        };

        let mut game = Self {
            phase: GamePhase::Hub,
            save,
            rng: Pcg32::seed_from_u64(seed),
            ids: IdGen::default(),
            store,
            player: None,
            enemies: Vec::new(),
            bosses: Vec::new(),
            player_bullets: Vec::new(),
            enemy_bullets: Vec::new(),
            obstacles: Vec::new(),
            powerups: Vec::new(),
            hazards: Vec::new(),
            slow_zones: Vec::new(),
            singularities: Vec::new(),
            particles: Vec::new(),
            floating_text: Vec::new(),
            interactables: Vec::new(),
            well: None,
            shake: ScreenShake::default(),
            scheduler: Scheduler::default(),
            current_boss: None,
            stage: -1,
            wave: -1,
            to_spawn: 0,
            spawn_timer: 0.0,
            intro_timer: 0.0,
            test_mode: false,
            shards_run: 0,
            intermission_choices: Vec::new(),
            highlighted: None,
            cues: Vec::new(),
            music: None,
        };
        game.enter_hub();
        game
    }

    // ---- Shell-facing API -------------------------------------------------

    pub fn tick(&mut self, raw_dt: f32, input: &TickInput) {
        let dt = raw_dt.min(consts::MAX_DT);

        self.shake.update(dt);

        match self.phase {
            GamePhase::Hub => self.update_hub(dt, input),
            GamePhase::Playing | GamePhase::BossIntro => self.update_combat(dt, input),
            _ => {}
        }

        self.sweep();
    }

    pub fn snapshot(&self) -> Snapshot {
        let boss = self.current_boss.and_then(|(id, _)| {
            self.bosses
                .iter()
                .find(|b| b.body.id == id)
                .map(|b| BossStatus {
                    name: b.name,
                    health: b.body.health.max(0.0),
                    max_health: b.body.max_health,
                    phase: b.phase,
                })
        });

        Snapshot {
            phase: self.phase,
            stage: self.stage,
            stage_name: (self.stage >= 0)
                .then(|| STAGES.get(self.stage as usize).map(|s| s.name))
                .flatten(),
            wave: self.wave,
            shards: self.save.shards,
            run_shards: self.shards_run,
            player: self.player.as_ref().map(|p| PlayerStatus {
                health: p.body.health.max(0.0),
                max_health: p.body.max_health,
                ultimate: p.ultimate,
                shielded: p.shield_health > 0.0,
            }),
            boss,
            prompt: self
                .highlighted
                .and_then(|i| self.interactables.get(i))
                .map(|f| f.prompt),
            intermission_choices: self.intermission_choices.clone(),
            shake: self.shake.magnitude(),
            enemies: self.enemies.len(),
            bullets: self.player_bullets.len() + self.enemy_bullets.len(),
        }
    }

    pub fn take_cues(&mut self) -> Vec<SoundCue> {
        mem::take(&mut self.cues)
    }

    pub fn music(&self) -> Option<MusicTrack> {
        self.music
    }

    pub fn intermission_choices(&self) -> &[TempBuff] {
        &self.intermission_choices
    }

    /// Launch a fight from the test chamber roster.
    pub fn start_test_fight(&mut self, index: usize) {
        match BossId::ALL.get(index) {
            Some(&id) => self.start_new_game(true, Some(id)),
            None => warn!("test chamber index {index} out of range"),
        }
    }

    pub fn start_run(&mut self) {
        self.start_new_game(false, None);
    }

    pub fn return_to_hub(&mut self) {
        self.enter_hub();
    }

    /// Dismiss a hub overlay (upgrades, lore, test chamber).
    pub fn close_modal(&mut self) {
        if matches!(
            self.phase,
            GamePhase::UpgradeScreen | GamePhase::LoreScreen | GamePhase::TestChamber
        ) {
            self.phase = GamePhase::Hub;
        }
    }

    /// Spend shards on a permanent track. Returns false when unaffordable.
    pub fn purchase_upgrade(&mut self, kind: UpgradeKind) -> bool {
        let cost = kind.cost(self.save.level(kind));
        if self.save.shards < cost {
            return false;
        }
        self.save.shards -= cost;
        self.save.raise(kind);
        if let Some(player) = self.player.as_mut() {
            player.apply_upgrades(&self.save);
        }
        self.cues.push(SoundCue::UiClick);
        self.persist();
        info!("purchased {} (level {})", kind.name(), self.save.level(kind));
        true
    }

    /// Pick one of the offered intermission buffs and push on.
    pub fn apply_intermission_choice(&mut self, index: usize) {
        if self.phase != GamePhase::Intermission {
            return;
        }
        let Some(&buff) = self.intermission_choices.get(index) else {
            warn!("intermission choice {index} out of range");
            return;
        };
        if let Some(player) = self.player.as_mut() {
            player.apply_temp_buff(buff, &self.save);
        }
        self.intermission_choices.clear();
        self.cues.push(SoundCue::UiClick);
        self.start_next_stage();
    }

    // ---- Phase machine ----------------------------------------------------

    fn start_new_game(&mut self, test: bool, boss: Option<BossId>) {
        self.reset_run_state();
        self.shards_run = 0;
        self.test_mode = test;
        self.interactables.clear();
        self.highlighted = None;

        let spawn = Vec2::new(
            consts::ARENA_WIDTH / 2.0,
            consts::ARENA_HEIGHT - 150.0,
        );
        match self.player.as_mut() {
            Some(player) => player.body.pos = spawn,
            None => self.player = Some(Player::new(spawn, &self.save)),
        }

        match boss {
            Some(id) if test => self.start_boss_fight(id),
            _ => {
                self.stage = -1;
                self.wave = -1;
                self.start_next_stage();
            }
        }
    }

    fn start_next_stage(&mut self) {
        self.stage += 1;
        if self.stage as usize >= STAGES.len() {
            info!("all stages cleared");
            self.phase = GamePhase::Victory;
            self.music = None;
            return;
        }
        info!("entering stage {}: {}", self.stage + 1, STAGES[self.stage as usize].name);
        self.wave = 0;
        self.start_next_wave();
    }

    fn start_next_wave(&mut self) {
        let stage = &STAGES[self.stage as usize];
        match stage.waves.get(self.wave as usize) {
            Some(wave) => {
                self.to_spawn = wave.enemies;
                self.spawn_timer = 1.0;
                self.phase = GamePhase::Playing;
                self.music = Some(MusicTrack::Combat);
                info!("wave {} of {}: {} enemies", self.wave + 1, stage.name, wave.enemies);
            }
            None => match BossId::from_config(stage.boss) {
                Some(id) => self.start_boss_fight(id),
                None => warn!("stage {} names unknown boss id {:?}", stage.name, stage.boss),
            },
        }
    }

    fn start_boss_fight(&mut self, id: BossId) {
        let mut boss = Boss::spawn(
            id,
            self.ids.next(),
            Vec2::new(consts::ARENA_WIDTH / 2.0 - 75.0, 150.0),
            &mut self.rng,
        );
        boss.body.invincible = true;
        self.current_boss = Some((boss.body.id, boss.name));
        self.floating_text.push(FloatingText::new(
            Vec2::new(consts::ARENA_WIDTH / 2.0, consts::ARENA_HEIGHT / 2.0 - 50.0),
            boss.name.to_uppercase(),
            48.0,
        ));
        info!("boss fight: {}", boss.name);
        self.bosses.push(boss);
        self.phase = GamePhase::BossIntro;
        self.intro_timer = consts::BOSS_INTRO_DURATION;
    }

    fn enter_hub(&mut self) {
        self.test_mode = false;
        self.phase = GamePhase::Hub;
        self.reset_run_state();

        self.save.shards += self.shards_run;
        self.shards_run = 0;
        self.persist();

        let spawn = Vec2::new(consts::ARENA_WIDTH / 2.0, consts::ARENA_HEIGHT / 2.0);
        let mut player = Player::new(spawn, &self.save);
        player.reset_temporary_buffs(&self.save);
        self.player = Some(player);

        self.interactables = interact::hub_layout();
        self.highlighted = None;
        self.music = Some(MusicTrack::Hub);
        info!("entered hub ({} shards banked)", self.save.shards);
    }

    fn show_intermission(&mut self) {
        self.save.shards += self.shards_run;
        self.shards_run = 0;
        self.persist();

        let piercing_owned = self.player.as_ref().is_some_and(|p| p.piercing);
        let mut pool: Vec<TempBuff> = TempBuff::ALL
            .into_iter()
            .filter(|&b| b != TempBuff::Piercing || !piercing_owned)
            .collect();
        let mut choices = Vec::new();
        for _ in 0..3.min(pool.len()) {
            let i = self.rng.random_range(0..pool.len());
            choices.push(pool.swap_remove(i));
        }
        self.intermission_choices = choices;
        self.phase = GamePhase::Intermission;
        self.music = Some(MusicTrack::Hub);
    }

    fn reset_run_state(&mut self) {
        self.enemies.clear();
        self.bosses.clear();
        self.player_bullets.clear();
        self.enemy_bullets.clear();
        self.obstacles.clear();
        self.powerups.clear();
        self.hazards.clear();
        self.slow_zones.clear();
        self.singularities.clear();
        self.particles.clear();
        self.floating_text.clear();
        self.scheduler.clear();
        self.well = None;
        self.current_boss = None;
        self.to_spawn = 0;
        self.spawn_timer = 0.0;
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.save) {
            warn!("failed to save progress: {e}");
        }
    }

    // ---- Per-phase updates ------------------------------------------------

    fn update_hub(&mut self, dt: f32, input: &TickInput) {
        if let Some(mut player) = self.player.take() {
            let mut ctx = PlayerCtx {
                ids: &mut self.ids,
                rng: &mut self.rng,
                slow_zones: &self.slow_zones,
                obstacles: &self.obstacles,
                well: self.well,
                bullets: &mut self.player_bullets,
                singularities: &mut self.singularities,
                particles: &mut self.particles,
                shake: &mut self.shake,
                cues: &mut self.cues,
            };
            player.update(dt, input, true, &mut ctx);
            self.player = Some(player);
        }

        self.highlighted = self
            .player
            .as_ref()
            .and_then(|p| interact::update_highlight(&mut self.interactables, p.body.center()));

        if input.interact {
            if let Some(fixture) = self.highlighted.and_then(|i| self.interactables.get(i)) {
                let action = fixture.action;
                self.cues.push(SoundCue::UiClick);
                match action {
                    InteractAction::StartRun => self.start_new_game(false, None),
                    InteractAction::OpenTestChamber => self.phase = GamePhase::TestChamber,
                    InteractAction::OpenUpgrades => self.phase = GamePhase::UpgradeScreen,
                    InteractAction::OpenLore => self.phase = GamePhase::LoreScreen,
                }
            }
        }

        for p in &mut self.particles {
            p.update(dt);
        }
        for t in &mut self.floating_text {
            t.update(dt);
        }
    }

    fn update_combat(&mut self, dt: f32, input: &TickInput) {
        self.fire_due_actions(dt);

        if let Some(mut player) = self.player.take() {
            let mut ctx = PlayerCtx {
                ids: &mut self.ids,
                rng: &mut self.rng,
                slow_zones: &self.slow_zones,
                obstacles: &self.obstacles,
                well: self.well,
                bullets: &mut self.player_bullets,
                singularities: &mut self.singularities,
                particles: &mut self.particles,
                shake: &mut self.shake,
                cues: &mut self.cues,
            };
            player.update(dt, input, false, &mut ctx);
            self.player = Some(player);
        }

        let player_center = self.player.as_ref().map(|p| p.body.center());
        let player_ref = self.player.as_ref().map(|p| PlayerRef {
            center: p.body.center(),
            pos: p.body.pos,
        });

        let mut enemies = mem::take(&mut self.enemies);
        for enemy in &mut enemies {
            enemy.update(
                dt,
                player_center,
                &mut self.rng,
                &mut self.ids,
                &mut self.enemy_bullets,
            );
        }
        self.enemies = enemies;

        // Bosses spawn clones into the (taken-empty) partition via the ctx
        let mut bosses = mem::take(&mut self.bosses);
        {
            let mut ctx = BossCtx {
                ids: &mut self.ids,
                rng: &mut self.rng,
                player: player_ref,
                enemy_bullets: &mut self.enemy_bullets,
                enemies: &mut self.enemies,
                obstacles: &mut self.obstacles,
                hazards: &mut self.hazards,
                slow_zones: &mut self.slow_zones,
                floating_text: &mut self.floating_text,
                particles: &mut self.particles,
                spawned: &mut self.bosses,
                scheduler: &mut self.scheduler,
                well: &mut self.well,
                shake: &mut self.shake,
                cues: &mut self.cues,
            };
            for boss in &mut bosses {
                boss.update(dt, &mut ctx);
            }
        }
        bosses.append(&mut self.bosses);
        self.bosses = bosses;

        let well = self.well;
        for bullet in &mut self.player_bullets {
            bullet.update(dt, player_center, well);
        }
        for bullet in &mut self.enemy_bullets {
            bullet.update(dt, player_center, well);
        }

        let mut obstacles = mem::take(&mut self.obstacles);
        for obstacle in &mut obstacles {
            obstacle.update(dt, &mut self.rng, &mut self.particles);
        }
        obstacles.append(&mut self.obstacles);
        self.obstacles = obstacles;

        for p in &mut self.particles {
            p.update(dt);
        }
        for t in &mut self.floating_text {
            t.update(dt);
        }
        for p in &mut self.powerups {
            p.update(dt);
        }

        let mut singularities = mem::take(&mut self.singularities);
        let mut charge = 0.0;
        for s in &mut singularities {
            charge += s.update(
                dt,
                &mut self.enemies,
                &mut self.bosses,
                &mut self.enemy_bullets,
                &mut self.well,
                &mut self.floating_text,
            );
        }
        self.singularities = singularities;
        if charge > 0.0 {
            if let Some(player) = self.player.as_mut() {
                player.add_ultimate(charge);
            }
        }

        for h in &mut self.hazards {
            h.update(dt);
        }
        for z in &mut self.slow_zones {
            z.update(dt);
        }

        self.handle_collisions(dt);

        if self.phase == GamePhase::BossIntro {
            self.intro_timer -= dt;
            if self.intro_timer <= 0.0 {
                self.phase = GamePhase::Playing;
                for boss in &mut self.bosses {
                    if !boss.is_clone() {
                        boss.body.invincible = false;
                    }
                }
            }
        }

        if self.phase == GamePhase::Playing {
            self.update_waves(dt);
        }

        if self.player.as_ref().is_some_and(|p| p.body.removed) {
            self.shake.trigger(25.0, 0.5);
            let center = self
                .player
                .as_ref()
                .map(|p| p.body.center())
                .unwrap_or_default();
            for _ in 0..5 {
                effects::spawn_burst(&mut self.particles, &mut self.rng, center, "", true);
            }
            self.player = None;
            self.scheduler
                .schedule(1.0, Owner::Run, DeferredAction::PlayerDeath);
        }
    }

    fn update_waves(&mut self, dt: f32) {
        if self.to_spawn > 0 {
            self.spawn_timer -= dt;
            if self.spawn_timer <= 0.0 {
                let pos = self.random_edge_position();
                let enemy = Enemy::new(self.ids.next(), pos, &mut self.rng);
                self.enemies.push(enemy);
                self.to_spawn -= 1;
                self.spawn_timer = STAGES[self.stage as usize].waves[self.wave as usize]
                    .spawn_interval;
            }
        } else if self.enemies.is_empty() && self.current_boss.is_none() {
            self.wave += 1;
            self.start_next_wave();
        }
    }

    fn random_edge_position(&mut self) -> Vec2 {
        let w = consts::ARENA_WIDTH;
        let h = consts::ARENA_HEIGHT;
        match self.rng.random_range(0..4) {
            0 => Vec2::new(self.rng.random_range(0.0..w), -50.0),
            1 => Vec2::new(w + 50.0, self.rng.random_range(0.0..h)),
            2 => Vec2::new(self.rng.random_range(0.0..w), h + 50.0),
            _ => Vec2::new(-50.0, self.rng.random_range(0.0..h)),
        }
    }

    // ---- Deferred actions -------------------------------------------------

    fn fire_due_actions(&mut self, dt: f32) {
        for entry in self.scheduler.tick(dt) {
            // Boss-owned actions die with their boss
            let boss_idx = match entry.owner {
                Owner::Run => None,
                Owner::Boss(id) => {
                    match self
                        .bosses
                        .iter()
                        .position(|b| b.body.id == id && !b.body.removed)
                    {
                        Some(i) => Some(i),
                        None => continue,
                    }
                }
            };

            match entry.action {
                DeferredAction::StallionShot { speed, homing } => {
                    let (Some(i), Some(target)) =
                        (boss_idx, self.player.as_ref().map(|p| p.body.center()))
                    else {
                        continue;
                    };
                    let center = self.bosses[i].body.center();
                    let phase = self.bosses[i].phase;
                    self.cues.push(SoundCue::Shoot);
                    self.enemy_bullets.push(
                        bullet::aimed(self.ids.next(), center, target, speed, Vec2::splat(12.0), 1.0)
                            .with_homing(homing),
                    );
                    // Phase 2 lasers pick up flanking pellets
                    if phase == 2 && homing == 0.0 {
                        let base = bosses::angle_to(center, target);
                        for sign in [-1.0f32, 1.0] {
                            let angle = base + sign * std::f32::consts::PI / 12.0;
                            self.enemy_bullets.push(Bullet::new(
                                self.ids.next(),
                                center,
                                Vec2::from_angle(angle) * speed * 0.8,
                                Vec2::splat(8.0),
                                bullet::BulletOwner::Enemy,
                                0.5,
                            ));
                        }
                    }
                }
                DeferredAction::StallionCharge { target } => {
                    let Some(i) = boss_idx else { continue };
                    let id = self.bosses[i].body.id;
                    self.bosses[i].start_charge(target);
                    self.scheduler.schedule(
                        1.5,
                        Owner::Boss(id),
                        DeferredAction::StallionChargeEnd,
                    );
                }
                DeferredAction::StallionChargeEnd => {
                    if let Some(i) = boss_idx {
                        self.bosses[i].end_charge_invincibility();
                    }
                }
                DeferredAction::SovereignSpawn => {
                    let Some(i) = boss_idx else { continue };
                    let pos = self.bosses[i].body.pos
                        + Vec2::new(
                            self.rng.random_range(-50.0..50.0),
                            self.rng.random_range(-50.0..50.0),
                        );
                    let enemy = Enemy::new(self.ids.next(), pos, &mut self.rng);
                    self.enemies.push(enemy);
                }
                DeferredAction::SovereignSpawnEnd => {
                    if let Some(i) = boss_idx {
                        self.bosses[i].end_spawn_window();
                    }
                }
                DeferredAction::MortarTelegraph => {
                    let Some(target) = self.player.as_ref().map(|p| p.body.center()) else {
                        continue;
                    };
                    let spot = target
                        + Vec2::new(
                            self.rng.random_range(-150.0..150.0),
                            self.rng.random_range(-150.0..150.0),
                        );
                    self.hazards.push(Hazard::beam(
                        self.ids.next(),
                        spot - Vec2::splat(30.0),
                        Vec2::splat(60.0),
                        1.0,
                        0.0,
                        true,
                    ));
                    // The round lands even if the forge master dies first
                    self.scheduler.schedule(
                        1.0,
                        Owner::Run,
                        DeferredAction::MortarImpact { center: spot },
                    );
                }
                DeferredAction::MortarImpact { center } => {
                    self.hazards.push(Hazard::lava_pool(self.ids.next(), center));
                    effects::spawn_burst(&mut self.particles, &mut self.rng, center, "#fa0", true);
                    self.cues.push(SoundCue::Explosion);
                }
                DeferredAction::TorrentShot { origin, angle } => {
                    if boss_idx.is_none() {
                        continue;
                    }
                    self.enemy_bullets.push(Bullet::new(
                        self.ids.next(),
                        origin,
                        Vec2::from_angle(angle) * 500.0,
                        Vec2::new(8.0, 20.0),
                        bullet::BulletOwner::Enemy,
                        1.0,
                    ));
                }
                DeferredAction::WhirlpoolEnd { boss, center } => {
                    // Run-owned: the well must clear even if the horror died
                    self.well = None;
                    if let Some(b) = self.bosses.iter_mut().find(|b| b.body.id == boss) {
                        b.end_whirlpool();
                    }
                    for i in 0..36 {
                        let angle = i as f32 * std::f32::consts::PI / 18.0;
                        self.enemy_bullets.push(Bullet::new(
                            self.ids.next(),
                            center,
                            Vec2::from_angle(angle) * 400.0,
                            Vec2::splat(10.0),
                            bullet::BulletOwner::Enemy,
                            1.0,
                        ));
                    }
                }
                DeferredAction::SweepFire { horizontal, offset } => {
                    if boss_idx.is_none() {
                        continue;
                    }
                    let (origin, extent) = bosses::sweep_segment(horizontal, offset);
                    self.hazards
                        .push(Hazard::beam(self.ids.next(), origin, extent, 0.5, 3.0, false));
                    self.shake.trigger(10.0, 0.5);
                }
                DeferredAction::PlayerDeath => {
                    if self.test_mode {
                        self.music = None;
                        self.enter_hub();
                        self.phase = GamePhase::TestChamber;
                    } else {
                        info!("run over at stage {} wave {}", self.stage + 1, self.wave + 1);
                        self.phase = GamePhase::GameOver;
                        self.music = None;
                        self.cues.push(SoundCue::GameOver);
                    }
                }
            }
        }
    }

    // ---- Collision pass ---------------------------------------------------

    fn handle_collisions(&mut self, dt: f32) {
        // 1-2. Player bullets against enemies, bosses, then obstacles
        let mut bullets = mem::take(&mut self.player_bullets);
        for bullet in &mut bullets {
            if bullet.body.removed {
                continue;
            }

            for i in 0..self.enemies.len() {
                if bullet.body.removed {
                    break;
                }
                let hit = {
                    let e = &self.enemies[i].body;
                    !e.removed && !e.invincible && bullet.body.overlaps(e)
                };
                if hit {
                    self.hit_enemy(i, bullet.damage);
                    if !bullet.piercing {
                        bullet.body.removed = true;
                    }
                }
            }

            for i in 0..self.bosses.len() {
                if bullet.body.removed {
                    break;
                }
                let hit = {
                    let b = &self.bosses[i].body;
                    !b.removed && !b.invincible && bullet.body.overlaps(b)
                };
                if hit {
                    self.hit_boss(i, bullet.damage);
                    if !bullet.piercing {
                        bullet.body.removed = true;
                    }
                }
            }
        }

        for bullet in &mut bullets {
            if bullet.body.removed {
                continue;
            }
            for i in 0..self.obstacles.len() {
                if bullet.body.removed {
                    break;
                }
                let hit = {
                    let o = &self.obstacles[i].body;
                    !o.removed && bullet.body.overlaps(o)
                };
                if !hit {
                    continue;
                }
                self.hit_obstacle(i, bullet.damage);

                if bullet.ricochet > 0 {
                    let center = bullet.body.center();
                    let prev = center - bullet.body.vel * dt;
                    let o = &self.obstacles[i].body;
                    match geom::segment_rect_intersection(prev, center, o.pos, o.size) {
                        Some(hit) => {
                            bullet.ricochet -= 1;
                            bullet.body.vel = geom::reflect(bullet.body.vel, hit.normal);
                            bullet.body.pos = hit.point - bullet.body.size * 0.5;
                            self.cues.push(SoundCue::Hit);
                        }
                        None => {
                            if !bullet.piercing {
                                bullet.body.removed = true;
                            }
                        }
                    }
                } else if !bullet.piercing {
                    bullet.body.removed = true;
                }
            }
        }
        self.player_bullets = bullets;

        // 3. Enemy bullets against the player: consumed only when health
        //    absorbed the hit
        let mut enemy_bullets = mem::take(&mut self.enemy_bullets);
        for bullet in &mut enemy_bullets {
            if bullet.body.removed {
                continue;
            }
            let overlapping = self
                .player
                .as_ref()
                .is_some_and(|p| bullet.body.overlaps(&p.body));
            if overlapping && self.damage_player(bullet.damage) {
                bullet.body.removed = true;
            }
        }

        // 4. Enemy bullets splash on obstacles
        for bullet in &mut enemy_bullets {
            if bullet.body.removed {
                continue;
            }
            for obstacle in &self.obstacles {
                if !obstacle.body.removed && bullet.body.overlaps(&obstacle.body) {
                    bullet.body.removed = true;
                    effects::spawn_burst(
                        &mut self.particles,
                        &mut self.rng,
                        bullet.body.center(),
                        "#ccc",
                        false,
                    );
                    break;
                }
            }
        }
        self.enemy_bullets = enemy_bullets;

        // 5. Body contact with enemies and bosses
        for i in 0..self.enemies.len() {
            let touching = {
                let e = &self.enemies[i].body;
                !e.removed
                    && self.player.as_ref().is_some_and(|p| p.body.overlaps(e))
            };
            if touching {
                self.damage_player(1.0);
            }
        }
        for i in 0..self.bosses.len() {
            let touching = {
                let b = &self.bosses[i].body;
                !b.removed
                    && self.player.as_ref().is_some_and(|p| p.body.overlaps(b))
            };
            if touching {
                self.damage_player(1.0);
            }
        }

        // 6. Pickups
        for i in 0..self.powerups.len() {
            let touching = {
                let pu = &self.powerups[i].body;
                !pu.removed
                    && self.player.as_ref().is_some_and(|p| p.body.overlaps(pu))
            };
            if touching {
                let kind = self.powerups[i].kind;
                self.powerups[i].body.removed = true;
                self.cues.push(SoundCue::PowerUp);
                if let Some(player) = self.player.as_mut() {
                    player.activate_powerup(kind);
                }
            }
        }

        // 7. Hazards
        for i in 0..self.hazards.len() {
            if self.hazards[i].body.removed {
                continue;
            }
            match self.hazards[i].kind {
                HazardKind::Pool { dps } => {
                    let touching = {
                        let hb = &self.hazards[i].body;
                        self.player.as_ref().is_some_and(|p| p.body.overlaps(hb))
                    };
                    if touching {
                        self.damage_player(dps * dt);
                    }
                }
                HazardKind::Beam { damage, telegraph } => {
                    if telegraph {
                        continue;
                    }
                    let grazed = {
                        let (a, b) = self.hazards[i].segment();
                        self.player.as_ref().is_some_and(|p| {
                            let reach = p.body.size.x / 2.0;
                            geom::point_segment_dist_sq(p.body.center(), a, b) < reach * reach
                        })
                    };
                    if grazed {
                        self.damage_player(damage);
                    }
                }
            }
        }

        // 8. Pulsing crystals bite back
        for i in 0..self.obstacles.len() {
            let touching = {
                let o = &self.obstacles[i];
                o.pulsing
                    && !o.body.removed
                    && self.player.as_ref().is_some_and(|p| p.body.overlaps(&o.body))
            };
            if touching {
                self.damage_player(1.0);
            }
        }
    }

    fn hit_enemy(&mut self, index: usize, damage: f32) {
        let (center, top) = {
            let e = &mut self.enemies[index].body;
            e.health -= damage;
            (e.center(), e.pos.y)
        };
        self.floating_text.push(FloatingText::new(
            Vec2::new(center.x, top),
            geom::format_damage(damage),
            16.0,
        ));
        if let Some(player) = self.player.as_mut() {
            player.add_ultimate(1.0);
        }

        if self.enemies[index].body.health <= 0.0 {
            self.enemies[index].body.removed = true;
            self.cues.push(SoundCue::Explosion);
            effects::spawn_burst(&mut self.particles, &mut self.rng, center, "", true);
            self.shards_run += 1;
            if self.rng.random_range(0.0..1.0) < 0.1 {
                let kind = PowerUpKind::ALL[self.rng.random_range(0..PowerUpKind::ALL.len())];
                let powerup = PowerUp::new(self.ids.next(), center, kind, &mut self.rng);
                self.powerups.push(powerup);
            }
        } else {
            self.cues.push(SoundCue::Hit);
        }
    }

    fn hit_boss(&mut self, index: usize, damage: f32) {
        let (center, top) = {
            let b = &mut self.bosses[index].body;
            b.health -= damage;
            (b.center(), b.pos.y)
        };
        self.floating_text.push(FloatingText::new(
            Vec2::new(center.x, top),
            geom::format_damage(damage),
            16.0,
        ));
        if let Some(player) = self.player.as_mut() {
            player.add_ultimate(1.0);
        }

        if self.bosses[index].body.health <= 0.0 {
            self.bosses[index].body.removed = true;
            self.cues.push(SoundCue::Explosion);
            effects::spawn_burst(&mut self.particles, &mut self.rng, center, "", true);
            if !self.bosses[index].is_clone() {
                self.shards_run += self.bosses[index].shard_value;
                info!("{} defeated", self.bosses[index].name);
            }
        } else {
            self.cues.push(SoundCue::Hit);
        }
    }

    fn hit_obstacle(&mut self, index: usize, damage: f32) {
        let (center, top) = {
            let o = &mut self.obstacles[index].body;
            o.health -= damage;
            (o.center(), o.pos.y)
        };
        self.floating_text.push(FloatingText::new(
            Vec2::new(center.x, top),
            geom::format_damage(damage),
            16.0,
        ));
        effects::spawn_burst(&mut self.particles, &mut self.rng, center, "#8ff", false);
        if self.obstacles[index].body.health <= 0.0 {
            self.obstacles[index].body.removed = true;
            self.cues.push(SoundCue::Explosion);
            effects::spawn_burst(&mut self.particles, &mut self.rng, center, "", true);
        }
    }

    /// Feedback wrapper around `Player::take_damage`. Returns true when
    /// health absorbed the hit.
    fn damage_player(&mut self, amount: f32) -> bool {
        let Some(player) = self.player.as_mut() else {
            return false;
        };
        let center = player.body.center();
        match player.take_damage(amount) {
            HitOutcome::Ignored => false,
            HitOutcome::Shielded => {
                self.cues.push(SoundCue::Hit);
                effects::spawn_burst(&mut self.particles, &mut self.rng, center, "#0ff", true);
                false
            }
            HitOutcome::Hit { died } => {
                self.cues.push(SoundCue::Hit);
                self.shake.trigger(6.0, 0.25);
                if died {
                    self.cues.push(SoundCue::Explosion);
                }
                true
            }
        }
    }

    // ---- End-of-tick sweep ------------------------------------------------

    fn sweep(&mut self) {
        self.enemies.retain(|e| !e.body.removed);
        self.player_bullets.retain(|b| !b.body.removed);
        self.enemy_bullets.retain(|b| !b.body.removed);
        self.obstacles.retain(|o| !o.body.removed);
        self.powerups.retain(|p| !p.body.removed);
        self.hazards.retain(|h| !h.body.removed);
        self.slow_zones.retain(|z| !z.expired());
        self.singularities.retain(|s| !s.removed);
        self.particles.retain(|p| !p.expired());
        self.floating_text.retain(|t| !t.expired());

        let had_bosses = !self.bosses.is_empty();
        self.bosses.retain(|b| !b.body.removed);

        if had_bosses && self.bosses.is_empty() {
            if let Some((_, name)) = self.current_boss {
                if name != "clone" {
                    self.current_boss = None;
                    if self.test_mode {
                        self.music = None;
                        self.enemy_bullets.clear();
                        self.enter_hub();
                        self.phase = GamePhase::TestChamber;
                    } else {
                        self.show_intermission();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn test_game() -> Game {
        Game::new(42, Box::new(MemoryStore::default()))
    }

    fn harden_player(game: &mut Game) {
        let player = game.player.as_mut().expect("player");
        player.body.max_health = 1e9;
        player.body.health = 1e9;
    }

    #[test]
    fn hub_interact_at_portal_starts_a_run() {
        let mut game = test_game();
        assert_eq!(game.phase, GamePhase::Hub);

        let portal = game.interactables[0].center();
        game.player.as_mut().expect("player").body.pos = portal;
        game.tick(
            0.016,
            &TickInput {
                interact: true,
                ..TickInput::default()
            },
        );

        assert_eq!(game.phase, GamePhase::Playing);
        assert_eq!(game.stage, 0);
        assert_eq!(game.wave, 0);
        assert_eq!(game.music(), Some(MusicTrack::Combat));
        assert!(game.take_cues().contains(&SoundCue::UiClick));
    }

    #[test]
    fn wave_spawner_delivers_the_configured_count() {
        let mut game = test_game();
        game.start_new_game(false, None);
        harden_player(&mut game);

        let expected = STAGES[0].waves[0].enemies;
        for _ in 0..300 {
            game.tick(0.05, &TickInput::default());
        }
        assert_eq!(game.to_spawn, 0);
        // Nothing kills them, so the whole wave is on the field
        assert_eq!(game.enemies.len() as u32, expected);
        // Wave can't advance while enemies remain
        assert_eq!(game.wave, 0);
    }

    #[test]
    fn boss_defeat_routes_to_intermission() {
        let mut game = test_game();
        game.start_new_game(false, None);
        game.start_boss_fight(BossId::CyberStallion);
        assert_eq!(game.phase, GamePhase::BossIntro);
        assert!(game
            .floating_text
            .iter()
            .any(|t| t.text == "CYBER STALLION"));

        game.bosses[0].body.removed = true;
        game.tick(0.016, &TickInput::default());

        assert_eq!(game.phase, GamePhase::Intermission);
        assert_eq!(game.intermission_choices.len(), 3);
        assert!(game.current_boss.is_none());

        game.apply_intermission_choice(0);
        assert_eq!(game.phase, GamePhase::Playing);
        assert_eq!(game.stage, 1);
        assert_eq!(game.wave, 0);
    }

    #[test]
    fn test_chamber_defeat_returns_to_the_chamber() {
        let mut game = test_game();
        game.start_test_fight(0);
        assert_eq!(game.phase, GamePhase::BossIntro);
        assert!(game.test_mode);

        game.bosses[0].body.removed = true;
        game.tick(0.016, &TickInput::default());

        assert_eq!(game.phase, GamePhase::TestChamber);
        assert!(!game.test_mode);
    }

    #[test]
    fn boss_kill_awards_shards_and_banks_them() {
        let mut game = test_game();
        game.start_new_game(false, None);
        game.start_boss_fight(BossId::CyberStallion);

        game.bosses[0].body.invincible = false;
        game.bosses[0].body.health = 0.5;
        let center = game.bosses[0].body.center();
        let id = game.ids.next();
        game.player_bullets.push(Bullet::new(
            id,
            center,
            Vec2::ZERO,
            Vec2::new(8.0, 20.0),
            bullet::BulletOwner::Player,
            1.0,
        ));

        game.handle_collisions(0.016);
        assert_eq!(game.shards_run, 150);

        game.tick(0.016, &TickInput::default());
        assert_eq!(game.phase, GamePhase::Intermission);
        assert_eq!(game.save.shards, 150);
        assert_eq!(game.shards_run, 0);
    }

    #[test]
    fn enemy_bullets_survive_shield_hits() {
        let mut game = test_game();
        game.start_new_game(false, None);
        let player_center = game.player.as_ref().expect("player").body.center();
        game.player
            .as_mut()
            .expect("player")
            .activate_powerup(PowerUpKind::Shield);

        let id = game.ids.next();
        game.enemy_bullets.push(Bullet::new(
            id,
            player_center,
            Vec2::ZERO,
            Vec2::splat(8.0),
            bullet::BulletOwner::Enemy,
            1.0,
        ));

        game.handle_collisions(0.016);
        let full = game.player.as_ref().expect("player").body.max_health;
        assert!(!game.enemy_bullets[0].body.removed);
        assert_eq!(game.player.as_ref().expect("player").body.health, full);

        // Shield gone, next contact is absorbed by health and eats the bullet
        game.handle_collisions(0.016);
        assert!(game.enemy_bullets[0].body.removed);
        assert_eq!(
            game.player.as_ref().expect("player").body.health,
            full - 1.0
        );
    }

    #[test]
    fn player_death_ends_the_run_after_a_beat() {
        let mut game = test_game();
        game.start_new_game(false, None);
        game.player.as_mut().expect("player").body.health = 1.0;
        game.damage_player(2.0);

        game.tick(0.016, &TickInput::default());
        assert!(game.player.is_none());
        assert_eq!(game.phase, GamePhase::Playing);

        for _ in 0..70 {
            game.tick(0.016, &TickInput::default());
        }
        assert_eq!(game.phase, GamePhase::GameOver);
        assert_eq!(game.music(), None);
        assert!(game.take_cues().contains(&SoundCue::GameOver));
    }

    #[test]
    fn enemy_hit_feedback_matches_the_damage_pipeline() {
        let mut game = test_game();
        game.start_new_game(false, None);

        let eid = game.ids.next();
        let enemy = Enemy::new(eid, Vec2::new(200.0, 200.0), &mut game.rng);
        let center = enemy.body.center();
        game.enemies.push(enemy);

        let bid = game.ids.next();
        game.player_bullets.push(Bullet::new(
            bid,
            center,
            Vec2::ZERO,
            Vec2::new(8.0, 20.0),
            bullet::BulletOwner::Player,
            1.0,
        ));

        game.handle_collisions(0.016);

        assert_eq!(game.enemies[0].body.health, 2.0);
        assert!(!game.enemies[0].body.removed);
        assert!(game.player_bullets[0].body.removed);
        assert!(game.floating_text.iter().any(|t| t.text == "1"));
        assert_eq!(game.player.as_ref().expect("player").ultimate, 1.0);
        assert!(game.take_cues().contains(&SoundCue::Hit));
    }

    #[test]
    fn boss_owned_actions_die_with_the_boss() {
        let mut game = test_game();
        game.start_new_game(false, None);
        game.start_boss_fight(BossId::CyberStallion);
        let id = game.bosses[0].body.id;

        // Live boss: the deferred shot fires
        game.scheduler.schedule(
            0.01,
            Owner::Boss(id),
            DeferredAction::StallionShot {
                speed: 450.0,
                homing: 0.0,
            },
        );
        game.tick(0.016, &TickInput::default());
        assert_eq!(game.enemy_bullets.len(), 1);
        game.enemy_bullets.clear();

        // Dead boss: the identical pending action is dropped
        game.scheduler.schedule(
            0.01,
            Owner::Boss(id),
            DeferredAction::StallionShot {
                speed: 450.0,
                homing: 0.0,
            },
        );
        game.bosses[0].body.removed = true;
        game.tick(0.016, &TickInput::default());
        assert!(game.enemy_bullets.is_empty());
        assert!(game.scheduler.is_empty());
    }

    #[test]
    fn newest_singularity_owns_the_well() {
        let mut game = test_game();
        game.start_new_game(false, None);
        game.singularities.push(Singularity::new(Vec2::new(100.0, 100.0)));
        game.singularities.push(Singularity::new(Vec2::new(900.0, 500.0)));

        game.tick(0.016, &TickInput::default());

        let well = game.well.expect("well");
        assert_eq!(well.center, Vec2::new(900.0, 500.0));
    }

    #[test]
    fn purchases_deduct_shards_and_persist() {
        let store = MemoryStore::with_data(SaveData {
            shards: 100,
            ..SaveData::default()
        });
        let handle = store.handle();
        let mut game = Game::new(1, Box::new(store));

        assert!(game.purchase_upgrade(UpgradeKind::Health));
        assert_eq!(game.save.shards, 75);
        assert_eq!(game.save.health_level, 1);
        assert_eq!(handle.borrow().health_level, 1);

        assert!(game.purchase_upgrade(UpgradeKind::Damage));
        assert_eq!(game.save.shards, 35);
        // Second damage level costs 80, can't afford it
        assert!(!game.purchase_upgrade(UpgradeKind::Damage));
        assert_eq!(game.save.damage_level, 1);
    }

    #[test]
    fn oversized_frame_deltas_are_clamped() {
        let mut game = test_game();
        let x0 = game.player.as_ref().expect("player").body.pos.x;
        game.tick(
            1.0,
            &TickInput {
                right: true,
                ..TickInput::default()
            },
        );
        let moved = game.player.as_ref().expect("player").body.pos.x - x0;
        assert!(moved <= consts::PLAYER_BASE_SPEED * consts::MAX_DT + 1e-3);
    }

    #[test]
    fn clearing_the_last_stage_is_victory() {
        let mut game = test_game();
        game.start_new_game(false, None);
        game.stage = (STAGES.len() - 1) as i32;
        game.start_next_stage();
        assert_eq!(game.phase, GamePhase::Victory);
        assert_eq!(game.music(), None);
    }

    #[test]
    fn boss_intro_window_ends_with_a_vulnerable_boss() {
        let mut game = test_game();
        game.start_test_fight(0);
        harden_player(&mut game);
        assert!(game.bosses[0].body.invincible);

        for _ in 0..220 {
            game.tick(0.016, &TickInput::default());
        }
        assert_eq!(game.phase, GamePhase::Playing);
        assert!(!game.bosses[0].body.invincible);
    }
}
