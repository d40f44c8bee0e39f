// Renderer Shell: hosts the window, the renderer draws into it.
// No windows_subsystem attribute: renderer output is printed to the console.

fn main() {
    renderer_shell_lib::run()
}
